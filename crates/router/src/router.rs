//! 라우터 -- 메시지 제출 진입점과 버퍼/분류기/기록기 연결
//!
//! [`LogRouter`]는 수신부가 호출하는 동기 진입점 [`submit`]을
//! 제공합니다. 컨텍스트에 링 버퍼가 있으면 메시지를 보관하거나
//! 버퍼를 플러시한 뒤, 분류기가 산출한 모든 대상 출력에 기록합니다.
//!
//! 코어 전체가 단일 스레드에서 동작하므로 잠금이 없습니다. 호출자가
//! 한 번에 한 메시지씩 전달해야 하며, 각 메시지는 다음 메시지 처리
//! 전에 전체 대상 집합에 기록됩니다.
//!
//! [`submit`]: LogRouter::submit

use std::collections::HashMap;

use pmlogd_core::config::RoutingConfig;
use pmlogd_core::types::LogMessage;

use crate::classify::classify;
use crate::error::RouterError;
use crate::ringbuf::RingBuffer;
use crate::writer::OutputWriter;

/// 메시지 라우팅 엔진
///
/// 설정 테이블은 생성 시 검증되며 이후 변경되지 않습니다.
pub struct LogRouter {
    /// 불변 라우팅 설정
    config: RoutingConfig,
    /// 출력 테이블과 같은 순서의 기록기
    writers: Vec<OutputWriter>,
    /// 링 버퍼가 설정된 컨텍스트의 버퍼 (이름 기준)
    buffers: HashMap<String, RingBuffer>,
    /// 제출된 메시지 수
    submitted: u64,
    /// 기록된 라인 수 (출력별 합계)
    written: u64,
    /// 쓰기 실패 수
    write_errors: u64,
}

impl LogRouter {
    /// 검증된 설정에서 라우터를 생성합니다.
    pub fn new(config: RoutingConfig) -> Result<Self, RouterError> {
        config.validate()?;

        let writers = config
            .outputs()
            .iter()
            .cloned()
            .map(OutputWriter::new)
            .collect();

        let buffers = config
            .contexts()
            .filter_map(|context| {
                context
                    .ring_buffer
                    .map(|conf| (context.name.clone(), RingBuffer::new(conf)))
            })
            .collect();

        Ok(Self {
            config,
            writers,
            buffers,
            submitted: 0,
            written: 0,
            write_errors: 0,
        })
    }

    /// 라우팅 설정을 반환합니다.
    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// 제출된 메시지 수를 반환합니다.
    pub fn submitted_count(&self) -> u64 {
        self.submitted
    }

    /// 기록된 라인 수를 반환합니다 (메시지 하나가 여러 출력에
    /// 기록되면 각각 집계됩니다).
    pub fn written_count(&self) -> u64 {
        self.written
    }

    /// 쓰기 실패 수를 반환합니다.
    pub fn write_error_count(&self) -> u64 {
        self.write_errors
    }

    /// 해당 컨텍스트 버퍼에 보관 중인 엔트리 수를 반환합니다.
    pub fn buffered_count(&self, context: &str) -> Option<usize> {
        self.buffers.get(context).map(RingBuffer::len)
    }

    /// 모든 버퍼에서 축출/버림된 엔트리 수 합계를 반환합니다.
    pub fn buffer_dropped_count(&self) -> u64 {
        self.buffers.values().map(RingBuffer::dropped_count).sum()
    }

    /// 메시지 하나를 라우팅합니다. 수신부가 메시지당 한 번 호출합니다.
    ///
    /// 컨텍스트에 링 버퍼가 있고 메시지가 플러시 임계값보다 덜
    /// 심각하면 보관만 하고 반환합니다. 임계값 이상이면 보관된
    /// 메시지를 도착 순서대로 먼저 기록한 뒤 트리거 메시지를
    /// 기록합니다.
    pub fn submit(&mut self, msg: LogMessage) {
        self.submitted += 1;

        let Some(context) = self.config.resolve_context(&msg.context) else {
            // 검증된 설정에는 <global>이 항상 존재
            return;
        };
        let context_name = context.name.clone();

        if let Some(buffer) = self.buffers.get_mut(&context_name) {
            if !buffer.triggers_flush(msg.level) {
                buffer.push(msg);
                return;
            }

            let retained = buffer.drain_all();
            for pending in &retained {
                self.dispatch(pending);
            }
        }

        self.dispatch(&msg);
    }

    /// 분류기를 거쳐 대상 출력 전부에 기록합니다.
    fn dispatch(&mut self, msg: &LogMessage) {
        let targets = classify(
            &self.config,
            &msg.context,
            msg.facility,
            msg.level,
            &msg.program,
        );

        for index in targets {
            let Some(writer) = self.writers.get_mut(index) else {
                continue;
            };
            match writer.write_line(&msg.line) {
                Ok(()) => self.written += 1,
                Err(e) => {
                    self.write_errors += 1;
                    tracing::warn!(
                        output = writer.name(),
                        error = %e,
                        "failed to write log line, discarding"
                    );
                }
            }
        }
    }

    /// 종료 드레인: 모든 버퍼를 비우고 기록기를 닫습니다.
    ///
    /// 종료는 심각도 0(가장 심각)의 합성 트리거로 취급되므로 모든
    /// 보관 메시지가 기록됩니다.
    pub fn shutdown(&mut self) {
        let names: Vec<String> = self.buffers.keys().cloned().collect();
        for name in names {
            let retained = self
                .buffers
                .get_mut(&name)
                .map(RingBuffer::drain_all)
                .unwrap_or_default();
            if !retained.is_empty() {
                tracing::info!(
                    context = %name,
                    count = retained.len(),
                    "flushing ring buffer on shutdown"
                );
            }
            for pending in &retained {
                self.dispatch(pending);
            }
        }

        for writer in &mut self.writers {
            writer.close();
        }
    }
}
