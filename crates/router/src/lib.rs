#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`classify`]: 컨텍스트 규칙을 순서대로 평가하여 대상 출력 집합 산출
//! - [`ringbuf`]: 컨텍스트별 바이트 예산 링 버퍼 (레벨 트리거 플러시)
//! - [`writer`]: 출력별 추가 모드 기록기 및 번호 로테이션
//! - [`router`]: 제출 진입점 — 버퍼/분류기/기록기를 연결
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! submit -> (context lookup) -> RingBuffer? -> classify -> OutputWriter[n]
//! ```
//!
//! 메시지 처리 중 교차 동시성은 없습니다. 호출자가 한 번에 한
//! 메시지씩 전달합니다.

pub mod classify;
pub mod error;
pub mod ringbuf;
pub mod router;
pub mod writer;

// --- 주요 타입 re-export ---

pub use classify::classify;
pub use error::RouterError;
pub use ringbuf::RingBuffer;
pub use router::LogRouter;
pub use writer::OutputWriter;
