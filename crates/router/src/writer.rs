//! 출력 기록기 -- 추가 모드 쓰기와 번호 로테이션
//!
//! 출력마다 하나의 [`OutputWriter`]가 파일 핸들과 누적 크기를
//! 유지합니다. 핸들은 첫 쓰기에서 지연 오픈되며 (추가 모드, 0640),
//! 초기 크기는 기존 파일의 메타데이터에서 읽습니다.
//!
//! # 로테이션
//! 쓰기 후 누적 크기가 `max_size` 이상이면 로테이션이 일어납니다:
//! `P.N` 삭제, `P.(i-1) -> P.i` 순차 이동, `P -> P.1`, 새 `P` 오픈.
//! rename/unlink 실패는 경고만 남기고 계속 진행합니다. 라이브 파일
//! rename이 실패한 경우 기존 파일을 다시 열어 계속 쓰며, 다음
//! 쓰기에서 로테이션이 재시도될 수 있습니다.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pmlogd_core::config::OutputConf;

/// 출력별 파일 기록기
#[derive(Debug)]
pub struct OutputWriter {
    conf: OutputConf,
    file: Option<File>,
    current_size: u64,
    write_errors: u64,
}

impl OutputWriter {
    /// 기록기를 생성합니다. 파일은 첫 쓰기에서 오픈됩니다.
    pub fn new(conf: OutputConf) -> Self {
        Self {
            conf,
            file: None,
            current_size: 0,
            write_errors: 0,
        }
    }

    /// 출력 이름을 반환합니다.
    pub fn name(&self) -> &str {
        &self.conf.name
    }

    /// 라이브 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.conf.path
    }

    /// 현재 누적 크기를 반환합니다.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// 쓰기 실패 횟수를 반환합니다.
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// `generation` 세대 아카이브 경로 (`P.1` .. `P.N`)를 반환합니다.
    fn archive_path(&self, generation: u32) -> PathBuf {
        let mut path = self.conf.path.clone().into_os_string();
        path.push(format!(".{generation}"));
        PathBuf::from(path)
    }

    fn open_append(path: &Path) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o640);
        }
        options.open(path)
    }

    fn ensure_open(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            let file = Self::open_append(&self.conf.path)?;
            self.current_size = file.metadata()?.len();
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file not open"))
    }

    /// 한 줄을 기록합니다. 라인 뒤에 단일 `\n`이 덧붙습니다.
    ///
    /// 쓰기 후 크기가 `max_size` 이상이면 로테이션을 수행합니다.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let result = self.append(line);
        if result.is_err() {
            self.write_errors += 1;
        }
        result
    }

    fn append(&mut self, line: &str) -> io::Result<()> {
        let file = self.ensure_open()?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        self.current_size += line.len() as u64 + 1;

        if self.current_size >= self.conf.max_size {
            self.rotate();
        }
        Ok(())
    }

    /// 번호 로테이션을 수행합니다.
    fn rotate(&mut self) {
        tracing::debug!(
            output = %self.conf.name,
            size = self.current_size,
            max = self.conf.max_size,
            "rotating log file"
        );

        // rename 전에 현재 핸들을 닫음
        self.file = None;

        let deepest = self.archive_path(self.conf.rotations);
        match fs::remove_file(&deepest) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %deepest.display(),
                    error = %e,
                    "failed to remove oldest archive"
                );
            }
        }

        for generation in (2..=self.conf.rotations).rev() {
            let from = self.archive_path(generation - 1);
            let to = self.archive_path(generation);
            match fs::rename(&from, &to) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        from = %from.display(),
                        to = %to.display(),
                        error = %e,
                        "failed to shift archive"
                    );
                }
            }
        }

        if let Err(e) = fs::rename(&self.conf.path, &self.archive_path(1)) {
            tracing::warn!(
                path = %self.conf.path.display(),
                error = %e,
                "failed to archive live file, keeping it"
            );
        }

        match Self::open_append(&self.conf.path) {
            Ok(file) => {
                self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
                self.file = Some(file);
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.conf.path.display(),
                    error = %e,
                    "failed to reopen log file after rotation"
                );
                self.current_size = 0;
            }
        }
    }

    /// 버퍼링된 내용을 디스크로 내립니다.
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()
        } else {
            Ok(())
        }
    }

    /// 핸들을 닫습니다. 이후 쓰기는 다시 지연 오픈합니다.
    pub fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            file.flush().ok();
        }
    }
}
