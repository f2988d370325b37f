//! 출력 파일 확장자 위장
//!
//! 쓰기가 끝나면 `20240115.csv`를 `20240115.jpg`로 바꾸고, 다음 쓰기 전에 되돌립니다.
//! 두 이름이 동시에 있으면 실제 파일의 내용을 위장 파일 뒤에 붙인 뒤 하나로 합칩니다.
//! 이때 붙이는 쪽의 CSV 헤더 행은 버립니다.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use trafficwatch_core::WriteError;

use crate::format::CSV_HEADER;

/// 실제 경로에 대응하는 위장 경로 (`x.csv` → `x.jpg`)
pub fn disguised_path(real: &Path, extension: &str) -> PathBuf {
    real.with_extension(extension)
}

/// 위장된 파일을 실제 이름으로 되돌립니다.
///
/// 위장 파일이 없으면 아무것도 하지 않고 `false`를 반환합니다.
pub fn restore(real: &Path, disguised: &Path) -> Result<bool, WriteError> {
    if !disguised.exists() {
        return Ok(false);
    }
    if real.exists() {
        warn!(
            real = %real.display(),
            disguised = %disguised.display(),
            "both real and disguised files exist, merging"
        );
        append_file(real, disguised)?;
        remove_merged(real, disguised)?;
    }

    rename(disguised, real)?;
    debug!(from = %disguised.display(), to = %real.display(), "restored disguised file");
    Ok(true)
}

/// 실제 파일을 위장 이름으로 바꿉니다.
pub fn apply(real: &Path, disguised: &Path) -> Result<(), WriteError> {
    if disguised.exists() {
        append_file(real, disguised)?;
        remove_merged(real, disguised)?;
        return Ok(());
    }

    rename(real, disguised)?;
    debug!(from = %real.display(), to = %disguised.display(), "disguised output file");
    Ok(())
}

fn rename(from: &Path, to: &Path) -> Result<(), WriteError> {
    fs::rename(from, to).map_err(|source| WriteError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// `from`의 내용을 `to` 뒤에 붙입니다. `from`의 첫 행이 CSV 헤더면 건너뜁니다.
fn append_file(from: &Path, to: &Path) -> Result<(), WriteError> {
    let merge_err = |source: io::Error| WriteError::Merge {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let mut src = BufReader::new(fs::File::open(from).map_err(merge_err)?);
    let mut dst = OpenOptions::new().append(true).open(to).map_err(merge_err)?;

    let mut first = Vec::new();
    src.read_until(b'\n', &mut first).map_err(merge_err)?;
    if !is_csv_header(&first) {
        dst.write_all(&first).map_err(merge_err)?;
    }
    io::copy(&mut src, &mut dst).map_err(merge_err)?;
    Ok(())
}

fn is_csv_header(line: &[u8]) -> bool {
    line.strip_suffix(b"\n")
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .is_some_and(|l| l == CSV_HEADER.as_bytes())
}

fn remove_merged(from: &Path, to: &Path) -> Result<(), WriteError> {
    fs::remove_file(from).map_err(|source| WriteError::Merge {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}
