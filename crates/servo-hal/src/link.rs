//! 行链路实现
//!
//! 后台线程阻塞读取输入流并按行投递到通道，控制循环侧只做非阻塞的 `try_recv`，
//! 因此读取永远不会卡住控制周期。
//!
//! 输入按字节读取，非 UTF-8 字节被替换为 `U+FFFD` 后照常投递，由协议层拒绝；
//! 坏字节不会让链路断开。通道有界，主机发送过快时丢弃新行。

use crate::{HalError, HostLink};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use std::io::{BufRead, Write};
use std::thread;
use tracing::{debug, info, warn};

/// 待处理输入行的队列容量
pub const LINE_QUEUE_CAPACITY: usize = 16;

/// 基于 `BufRead` + `Write` 的主机链路
pub struct LineLink<W: Write> {
    rx: Receiver<String>,
    writer: W,
}

impl<W: Write> LineLink<W> {
    /// 启动读取线程
    ///
    /// # 参数
    ///
    /// - `reader`: 输入流（在后台线程中按行读取）
    /// - `writer`: 输出流（遥测写入）
    pub fn spawn<R>(reader: R, writer: W) -> Result<Self, HalError>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = bounded(LINE_QUEUE_CAPACITY);

        thread::Builder::new()
            .name("host-link-rx".into())
            .spawn(move || read_loop(reader, tx))?;

        Ok(Self { rx, writer })
    }
}

fn read_loop<R: BufRead>(mut reader: R, tx: Sender<String>) {
    let mut buf = Vec::with_capacity(64);
    let mut dropped = 0u64;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {},
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Host link read error: {}", e);
                return;
            },
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        let line = String::from_utf8_lossy(&buf).into_owned();
        debug!("Host link received: {:?}", line);

        match tx.try_send(line) {
            Ok(()) => {},
            Err(TrySendError::Full(line)) => {
                dropped += 1;
                if dropped.is_power_of_two() {
                    warn!(
                        "Host link queue full, dropped {:?} ({} dropped so far)",
                        line, dropped
                    );
                }
            },
            // 链路已被丢弃
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
    info!("Host link input closed");
}

impl LineLink<std::io::Stdout> {
    /// 标准输入/输出链路
    pub fn stdio() -> Result<Self, HalError> {
        Self::spawn(std::io::BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<W: Write> HostLink for LineLink<W> {
    fn try_read_line(&mut self) -> Result<Option<String>, HalError> {
        match self.rx.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(HalError::Disconnected),
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), HalError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}
