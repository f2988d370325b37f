//! One-shot nginx initialization (`trafficwatch-daemon init-nginx`).
//!
//! Makes nginx write the access log lines the log tail monitor parses:
//!
//! 1. The `http` block of the main config gets [`NGINX_LOG_FORMAT`].
//! 2. Every site config in `sites_dir` has its `access_log` switched to that
//!    format, provided it already logs to `{logs_dir}/{site}.log`.
//!
//! Each file is copied to `<file>.bak` before it is rewritten and copied back
//! when `nginx -t` rejects the result. A rejected main config aborts the run;
//! a rejected site is reported and the next site is tried.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::Regex;

use trafficwatch_collector::{NGINX_LOG_FORMAT, NGINX_LOG_FORMAT_NAME};
use trafficwatch_core::config::MiddlewareConfig;

/// Site config file names: `<label>.<domain...>.conf`.
const SITE_CONFIG_PATTERN: &str = r"^[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+\.conf$";

/// Access to the nginx binary.
pub trait NginxControl {
    /// Fails when nginx cannot be executed.
    fn verify_installed(&self) -> Result<()>;

    /// Runs a configuration test of `conf` (`nginx -t -c <conf>`).
    fn test_config(&self, conf: &Path) -> Result<()>;
}

/// [`NginxControl`] backed by a real nginx executable.
#[derive(Debug, Clone)]
pub struct SystemNginx {
    binary: PathBuf,
}

impl SystemNginx {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl NginxControl for SystemNginx {
    fn verify_installed(&self) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("-v")
            .output()
            .with_context(|| format!("failed to execute {}", self.binary.display()))?;
        if !output.status.success() {
            bail!("{} -v exited with {}", self.binary.display(), output.status);
        }
        Ok(())
    }

    fn test_config(&self, conf: &Path) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("-t")
            .arg("-c")
            .arg(conf)
            .output()
            .with_context(|| format!("failed to execute {}", self.binary.display()))?;
        if !output.status.success() {
            bail!(
                "nginx rejected {}: {}",
                conf.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Paths the initialization works on.
#[derive(Debug, Clone)]
pub struct NginxSetup {
    /// Main nginx config (`nginx.conf`).
    pub conf_path: PathBuf,
    /// Directory holding one config file per site.
    pub sites_dir: PathBuf,
    /// Directory the sites already write their access logs to.
    pub logs_dir: PathBuf,
}

impl NginxSetup {
    pub fn from_config(middleware: &MiddlewareConfig) -> Self {
        Self {
            conf_path: PathBuf::from(&middleware.config),
            sites_dir: PathBuf::from(&middleware.sites_dir),
            logs_dir: PathBuf::from(&middleware.logs_dir),
        }
    }
}

/// Outcome of an initialization run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InitReport {
    /// The main config was rewritten.
    pub log_format_updated: bool,
    /// Sites whose `access_log` now uses the custom format.
    pub updated_sites: Vec<String>,
    /// Sites that already used it.
    pub unchanged_sites: Vec<String>,
    /// Sites left as they were, with the reason.
    pub failed_sites: Vec<(String, String)>,
}

impl fmt::Display for InitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format_state = if self.log_format_updated {
            "updated"
        } else {
            "already present"
        };
        writeln!(f, "log_format {NGINX_LOG_FORMAT_NAME}: {format_state}")?;
        writeln!(
            f,
            "updated sites ({}): {}",
            self.updated_sites.len(),
            join_or_none(&self.updated_sites)
        )?;
        writeln!(
            f,
            "unchanged sites ({}): {}",
            self.unchanged_sites.len(),
            join_or_none(&self.unchanged_sites)
        )?;
        write!(f, "failed sites ({})", self.failed_sites.len())?;
        for (site, reason) in &self.failed_sites {
            write!(f, "\n  {site}: {reason}")?;
        }
        Ok(())
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_owned()
    } else {
        items.join(", ")
    }
}

/// Result of rewriting one site config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteEdit {
    /// New file contents.
    Rewritten(String),
    /// `access_log` already names the custom format.
    AlreadyCustom,
    /// The file cannot be adapted automatically.
    Skipped(String),
}

/// Runs the whole initialization. Blocking; call from `spawn_blocking`.
pub fn init_nginx(setup: &NginxSetup, nginx: &impl NginxControl) -> Result<InitReport> {
    nginx
        .verify_installed()
        .context("nginx is not installed")?;

    let mut report = InitReport {
        log_format_updated: update_main_config(&setup.conf_path, nginx)?,
        ..InitReport::default()
    };

    for path in discover_site_configs(&setup.sites_dir)? {
        let site = site_name(&path);
        let expected_log = setup.logs_dir.join(format!("{site}.log"));
        match update_site_config(&path, &expected_log, &setup.conf_path, nginx) {
            Ok(true) => {
                tracing::info!(site = %site, config = %path.display(), "access_log switched to custom format");
                report.updated_sites.push(site);
            }
            Ok(false) => report.unchanged_sites.push(site),
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!(site = %site, error = %reason, "site config left unchanged");
                report.failed_sites.push((site, reason));
            }
        }
    }

    Ok(report)
}

fn update_main_config(conf: &Path, nginx: &impl NginxControl) -> Result<bool> {
    let text = fs::read_to_string(conf)
        .with_context(|| format!("failed to read nginx config {}", conf.display()))?;
    let Some(rewritten) = ensure_log_format(&text) else {
        tracing::info!(config = %conf.display(), "log_format already present");
        return Ok(false);
    };

    write_checked(conf, &rewritten, conf, nginx)?;
    tracing::info!(config = %conf.display(), "log_format written");
    Ok(true)
}

fn update_site_config(
    path: &Path,
    expected_log: &Path,
    main_conf: &Path,
    nginx: &impl NginxControl,
) -> Result<bool> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read site config {}", path.display()))?;
    match ensure_site_access_log(&text, &expected_log.to_string_lossy()) {
        SiteEdit::AlreadyCustom => Ok(false),
        SiteEdit::Skipped(reason) => bail!(reason),
        SiteEdit::Rewritten(rewritten) => {
            write_checked(path, &rewritten, main_conf, nginx)?;
            Ok(true)
        }
    }
}

/// Replaces `path` with `contents` and validates `main_conf`. On any failure
/// the backup is copied back.
fn write_checked(
    path: &Path,
    contents: &str,
    main_conf: &Path,
    nginx: &impl NginxControl,
) -> Result<()> {
    let backup = backup_config(path)?;
    let result = fs::write(path, contents)
        .with_context(|| format!("failed to write {}", path.display()))
        .and_then(|()| nginx.test_config(main_conf));

    if let Err(e) = result {
        restore_config(path, &backup)?;
        return Err(e.context(format!("{} restored from backup", path.display())));
    }
    Ok(())
}

/// Copies `path` to `<path>.bak` and returns the backup path.
pub fn backup_config(path: &Path) -> Result<PathBuf> {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    let backup = PathBuf::from(name);
    fs::copy(path, &backup)
        .with_context(|| format!("failed to back up {} to {}", path.display(), backup.display()))?;
    Ok(backup)
}

/// Copies a backup made by [`backup_config`] over `path`.
pub fn restore_config(path: &Path, backup: &Path) -> Result<()> {
    fs::copy(backup, path)
        .with_context(|| format!("failed to restore {} from {}", path.display(), backup.display()))?;
    tracing::warn!(config = %path.display(), backup = %backup.display(), "config restored from backup");
    Ok(())
}

/// Site config files in `sites_dir`, sorted by path.
pub fn discover_site_configs(sites_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = Regex::new(SITE_CONFIG_PATTERN).context("invalid site config pattern")?;
    let entries = fs::read_dir(sites_dir)
        .with_context(|| format!("failed to read sites dir {}", sites_dir.display()))?;

    let mut configs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            continue;
        }
        let is_site = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| pattern.is_match(name));
        if is_site {
            configs.push(path);
        }
    }
    configs.sort();
    Ok(configs)
}

fn site_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(".conf") {
        Some(site) => site.to_owned(),
        None => name,
    }
}

/// Adds or refreshes the custom `log_format` in the `http` block.
///
/// Returns `None` when the config already carries the exact directive. A
/// config without an `http` block gets one appended.
pub fn ensure_log_format(text: &str) -> Option<String> {
    let directive = format!("{NGINX_LOG_FORMAT};");
    let mut lines = split_lines(text);

    let Some((open, close)) = find_block(&lines, "http") else {
        let mut out = text.to_owned();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("\nhttp {{\n    {directive}\n}}\n"));
        return Some(out);
    };

    let existing = direct_children(&lines, open, close).into_iter().find(|&i| {
        let mut words = lines[i].split_whitespace();
        words.next() == Some("log_format") && words.next() == Some(NGINX_LOG_FORMAT_NAME)
    });

    match existing {
        Some(start) => {
            // a format string may continue over several lines up to the `;`
            let mut end = start;
            while end + 1 < close && !strip_comment(&lines[end]).trim_end().ends_with(';') {
                end += 1;
            }
            let current: Vec<&str> = lines[start..=end]
                .iter()
                .map(|line| strip_comment(line).trim())
                .collect();
            if current.join(" ") == directive {
                return None;
            }
            let replacement = format!(
                "{}{directive}{}",
                indent_of(&lines[start]),
                line_ending(&lines[end])
            );
            lines.splice(start..=end, [replacement]);
        }
        None => {
            let line = format!("    {directive}{}", line_ending(&lines[open]));
            lines.insert(open + 1, line);
        }
    }
    Some(lines.concat())
}

/// Points the server block's `access_log` at the custom format.
///
/// Only an `access_log` directly inside the first `server` block counts, and
/// it must already write to `expected_log`.
pub fn ensure_site_access_log(text: &str, expected_log: &str) -> SiteEdit {
    let mut lines = split_lines(text);
    let Some((open, close)) = find_block(&lines, "server") else {
        return SiteEdit::Skipped("no server block".to_owned());
    };
    let Some(idx) = direct_children(&lines, open, close)
        .into_iter()
        .find(|&i| directive_name(&lines[i]) == "access_log")
    else {
        return SiteEdit::Skipped("no access_log in server block".to_owned());
    };

    let current = strip_comment(&lines[idx]).trim();
    let args: Vec<&str> = current
        .trim_end_matches(';')
        .split_whitespace()
        .skip(1)
        .collect();
    if args.first() != Some(&expected_log) {
        return SiteEdit::Skipped(format!(
            "access_log path mismatch: expected {expected_log}, found `{current}`"
        ));
    }

    let mut rebuilt = vec!["access_log", expected_log, NGINX_LOG_FORMAT_NAME];
    match args.get(1) {
        Some(&format) if format == NGINX_LOG_FORMAT_NAME => return SiteEdit::AlreadyCustom,
        // named format: replace it, keep buffer=/gzip/if= parameters
        Some(format) if !format.contains('=') => rebuilt.extend(&args[2..]),
        _ => rebuilt.extend(&args[1..]),
    }

    let updated = format!(
        "{}{};{}",
        indent_of(&lines[idx]),
        rebuilt.join(" "),
        line_ending(&lines[idx])
    );
    lines[idx] = updated;
    SiteEdit::Rewritten(lines.concat())
}

fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_owned).collect()
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("")
}

fn directive_name(line: &str) -> &str {
    strip_comment(line)
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '{' || c == ';')
        .next()
        .unwrap_or("")
}

fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") { "\r\n" } else { "\n" }
}

/// `name` opens a block on this line (`name {` or a bare `name` before `{`).
fn is_block_header(line: &str, name: &str) -> bool {
    let code = strip_comment(line).trim();
    match code.strip_prefix(name) {
        Some(rest) => rest.is_empty() || rest.trim_start().starts_with('{'),
        None => false,
    }
}

/// Lines holding the opening and closing brace of the first `name` block.
fn find_block(lines: &[String], name: &str) -> Option<(usize, usize)> {
    let header = lines.iter().position(|line| is_block_header(line, name))?;
    let mut depth = 0usize;
    let mut open = None;
    for (i, line) in lines.iter().enumerate().skip(header) {
        for c in strip_comment(line).chars() {
            match c {
                '{' => {
                    depth += 1;
                    open.get_or_insert(i);
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    if let Some(open) = open {
                        if depth == 0 {
                            return Some((open, i));
                        }
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Non-empty lines directly inside the block (nested blocks excluded).
fn direct_children(lines: &[String], open: usize, close: usize) -> Vec<usize> {
    let mut depth = 1usize;
    let mut children = Vec::new();
    for (i, line) in lines.iter().enumerate().take(close).skip(open + 1) {
        let code = strip_comment(line);
        if depth == 1 && !code.trim().is_empty() && !code.trim_start().starts_with('}') {
            children.push(i);
        }
        for c in code.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Records config checks and fails the `fail_on`-th one (1-based).
    struct FakeNginx {
        installed: bool,
        fail_on: Option<usize>,
        checks: Cell<usize>,
    }

    impl FakeNginx {
        fn accepting() -> Self {
            Self {
                installed: true,
                fail_on: None,
                checks: Cell::new(0),
            }
        }

        fn rejecting(nth: usize) -> Self {
            Self {
                fail_on: Some(nth),
                ..Self::accepting()
            }
        }
    }

    impl NginxControl for FakeNginx {
        fn verify_installed(&self) -> Result<()> {
            if !self.installed {
                bail!("nginx: command not found");
            }
            Ok(())
        }

        fn test_config(&self, _conf: &Path) -> Result<()> {
            let n = self.checks.get() + 1;
            self.checks.set(n);
            if self.fail_on == Some(n) {
                bail!("emerg: unknown directive");
            }
            Ok(())
        }
    }

    const MAIN_CONF: &str = "user www-data;\nworker_processes auto;\n\nhttp\n{\n    include mime.types;\n    log_format main '$remote_addr - $request';\n    server_tokens off;\n    include conf.d/*.conf;\n}\n";

    fn site_conf(log: &str) -> String {
        format!(
            "upstream app {{\n    server 127.0.0.1:8080;\n}}\nserver {{\n    listen 443 ssl;\n    server_name www.example.com;\n    location /static {{\n        access_log off;\n    }}\n    access_log {log};\n}}\n"
        )
    }

    struct Layout {
        _dir: tempfile::TempDir,
        setup: NginxSetup,
    }

    fn layout(sites: &[(&str, String)]) -> Layout {
        let dir = tempfile::tempdir().unwrap();
        let sites_dir = dir.path().join("conf.d");
        fs::create_dir(&sites_dir).unwrap();
        let conf_path = dir.path().join("nginx.conf");
        fs::write(&conf_path, MAIN_CONF).unwrap();
        for (name, contents) in sites {
            fs::write(sites_dir.join(name), contents).unwrap();
        }
        Layout {
            setup: NginxSetup {
                conf_path,
                sites_dir,
                logs_dir: PathBuf::from("/www/wwwlogs"),
            },
            _dir: dir,
        }
    }

    #[test]
    fn log_format_is_inserted_after_http_brace_on_next_line() {
        let out = ensure_log_format(MAIN_CONF).unwrap();
        let expected = format!("http\n{{\n    {NGINX_LOG_FORMAT};\n    include mime.types;\n");
        assert!(out.contains(&expected), "{out}");
        // other formats stay
        assert!(out.contains("log_format main '$remote_addr - $request';"));
    }

    #[test]
    fn matching_log_format_is_left_alone() {
        let once = ensure_log_format(MAIN_CONF).unwrap();
        assert!(ensure_log_format(&once).is_none());
    }

    #[test]
    fn outdated_multiline_log_format_is_replaced() {
        let conf = "http {\n    log_format custom '$remote_addr'\n                      '$status';\n    sendfile on;\n}\n";
        let out = ensure_log_format(conf).unwrap();
        assert_eq!(
            out,
            format!("http {{\n    {NGINX_LOG_FORMAT};\n    sendfile on;\n}}\n")
        );
    }

    #[test]
    fn missing_http_block_is_appended() {
        let out = ensure_log_format("events {\n}").unwrap();
        assert_eq!(
            out,
            format!("events {{\n}}\n\nhttp {{\n    {NGINX_LOG_FORMAT};\n}}\n")
        );
    }

    #[test]
    fn site_access_log_gets_custom_format() {
        let edit = ensure_site_access_log(
            &site_conf("/www/wwwlogs/www.example.com.log"),
            "/www/wwwlogs/www.example.com.log",
        );
        let SiteEdit::Rewritten(out) = edit else {
            panic!("expected rewrite, got {edit:?}");
        };
        assert!(out.contains("\n    access_log /www/wwwlogs/www.example.com.log custom;\n"));
        // nested location and upstream blocks are untouched
        assert!(out.contains("        access_log off;\n"));
        assert!(out.contains("    server 127.0.0.1:8080;\n"));
    }

    #[test]
    fn site_named_format_is_replaced_and_parameters_kept() {
        let edit = ensure_site_access_log(
            &site_conf("/www/wwwlogs/a.example.com.log main buffer=32k"),
            "/www/wwwlogs/a.example.com.log",
        );
        let SiteEdit::Rewritten(out) = edit else {
            panic!("expected rewrite, got {edit:?}");
        };
        assert!(out.contains("access_log /www/wwwlogs/a.example.com.log custom buffer=32k;"));
        assert!(!out.contains(" main"));
    }

    #[test]
    fn site_edit_outcomes() {
        let log = "/www/wwwlogs/www.example.com.log";
        assert_eq!(
            ensure_site_access_log(&site_conf(&format!("{log} custom")), log),
            SiteEdit::AlreadyCustom
        );
        assert!(matches!(
            ensure_site_access_log(&site_conf("/var/log/other.log"), log),
            SiteEdit::Skipped(reason) if reason.contains("mismatch")
        ));
        assert!(matches!(
            ensure_site_access_log("upstream app {\n    server 10.0.0.1;\n}\n", log),
            SiteEdit::Skipped(reason) if reason == "no server block"
        ));
        assert!(matches!(
            ensure_site_access_log("server {\n    listen 80;\n}\n", log),
            SiteEdit::Skipped(reason) if reason == "no access_log in server block"
        ));
    }

    #[test]
    fn site_configs_are_filtered_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "www.example.com.conf",
            "api.example.org.conf",
            "default.conf",
            "www.example.com.conf.bak",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("dir.example.com.conf")).unwrap();

        let names: Vec<String> = discover_site_configs(dir.path())
            .unwrap()
            .iter()
            .map(|p| site_name(p))
            .collect();
        assert_eq!(names, ["api.example.org", "www.example.com"]);
    }

    #[test]
    fn init_updates_main_config_and_matching_sites() {
        let layout = layout(&[
            ("a.example.com.conf", site_conf("/www/wwwlogs/a.example.com.log")),
            ("b.example.com.conf", site_conf("/www/wwwlogs/b.example.com.log custom")),
            ("c.example.com.conf", site_conf("/var/log/nginx/c.log")),
        ]);
        let nginx = FakeNginx::accepting();

        let report = init_nginx(&layout.setup, &nginx).unwrap();

        assert!(report.log_format_updated);
        assert_eq!(report.updated_sites, ["a.example.com"]);
        assert_eq!(report.unchanged_sites, ["b.example.com"]);
        assert_eq!(report.failed_sites.len(), 1);
        assert_eq!(report.failed_sites[0].0, "c.example.com");
        // main config and one site were validated
        assert_eq!(nginx.checks.get(), 2);

        let conf = fs::read_to_string(&layout.setup.conf_path).unwrap();
        assert!(conf.contains(NGINX_LOG_FORMAT));
        let backup = fs::read_to_string(layout.setup.conf_path.with_extension("conf.bak")).unwrap();
        assert_eq!(backup, MAIN_CONF);

        // second run has nothing left to do
        let again = init_nginx(&layout.setup, &FakeNginx::accepting()).unwrap();
        assert!(!again.log_format_updated);
        assert_eq!(again.unchanged_sites, ["a.example.com", "b.example.com"]);
    }

    #[test]
    fn rejected_main_config_is_restored_and_aborts() {
        let layout = layout(&[("a.example.com.conf", site_conf("/www/wwwlogs/a.example.com.log"))]);

        let err = init_nginx(&layout.setup, &FakeNginx::rejecting(1)).unwrap_err();

        assert!(format!("{err:#}").contains("restored from backup"));
        assert_eq!(fs::read_to_string(&layout.setup.conf_path).unwrap(), MAIN_CONF);
        let site = fs::read_to_string(layout.setup.sites_dir.join("a.example.com.conf")).unwrap();
        assert!(!site.contains("custom"));
    }

    #[test]
    fn rejected_site_is_restored_and_reported() {
        let original = site_conf("/www/wwwlogs/a.example.com.log");
        let layout = layout(&[
            ("a.example.com.conf", original.clone()),
            ("b.example.com.conf", site_conf("/www/wwwlogs/b.example.com.log")),
        ]);

        // check 1: main config, check 2: site a
        let report = init_nginx(&layout.setup, &FakeNginx::rejecting(2)).unwrap();

        assert_eq!(report.updated_sites, ["b.example.com"]);
        assert_eq!(report.failed_sites[0].0, "a.example.com");
        assert!(report.failed_sites[0].1.contains("unknown directive"));
        assert_eq!(
            fs::read_to_string(layout.setup.sites_dir.join("a.example.com.conf")).unwrap(),
            original
        );
    }

    #[test]
    fn missing_nginx_changes_nothing() {
        let layout = layout(&[]);
        let nginx = FakeNginx {
            installed: false,
            ..FakeNginx::accepting()
        };

        let err = init_nginx(&layout.setup, &nginx).unwrap_err();

        assert!(err.to_string().contains("not installed"));
        assert_eq!(fs::read_to_string(&layout.setup.conf_path).unwrap(), MAIN_CONF);
    }

    #[test]
    fn setup_paths_come_from_middleware_config() {
        let setup = NginxSetup::from_config(&MiddlewareConfig::default());
        assert_eq!(setup.conf_path, PathBuf::from("/etc/nginx/nginx.conf"));
        assert_eq!(setup.sites_dir, PathBuf::from("/etc/nginx/conf.d"));
        assert_eq!(setup.logs_dir, PathBuf::from("/var/log/nginx"));
    }

    #[test]
    fn report_lists_every_site() {
        let report = InitReport {
            log_format_updated: true,
            updated_sites: vec!["a.example.com".to_owned()],
            unchanged_sites: Vec::new(),
            failed_sites: vec![("c.example.com".to_owned(), "no server block".to_owned())],
        };
        let text = report.to_string();
        assert!(text.starts_with("log_format custom: updated\n"));
        assert!(text.contains("updated sites (1): a.example.com"));
        assert!(text.contains("unchanged sites (0): none"));
        assert!(text.ends_with("failed sites (1)\n  c.example.com: no server block"));
    }
}
