//! 사이트 접근 로그 파일 탐색

use std::path::{Path, PathBuf};

/// 전역 접근 로그 파일 이름
pub const GLOBAL_ACCESS_LOG: &str = "global_access.log";

/// 사이트 접근 로그 파일 이름인지 판단합니다.
///
/// `<label>.<domain>.log` (예: `www.example.com.log`) 또는 `global_access.log`를
/// 허용하며, 이름에 `error`/`errlog`가 들어간 파일은 제외합니다.
pub fn is_site_log(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    if lower.contains("error") || lower.contains("errlog") {
        return false;
    }
    if file_name == GLOBAL_ACCESS_LOG {
        return true;
    }

    let Some(stem) = file_name.strip_suffix(".log") else {
        return false;
    };
    let Some((label, domain)) = stem.split_once('.') else {
        return false;
    };

    let label_ok = !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    let domain_ok = !domain.is_empty()
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    label_ok && domain_ok
}

/// 디렉토리에서 사이트 접근 로그 파일을 찾습니다 (하위 디렉토리는 보지 않음).
///
/// 결과는 경로 순으로 정렬됩니다.
pub fn discover_site_logs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| entry.file_name().to_str().is_some_and(is_site_log))
        .map(|entry| entry.path())
        .collect();
    files.sort();
    Ok(files)
}
