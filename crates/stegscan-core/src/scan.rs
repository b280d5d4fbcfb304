//! 批量扫描主流程与并行调度
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::engine::Engine;
use crate::options::{ScanOptions, ScanStats};
use crate::types::{SecurityReport, SecurityStatus};

/// 输出项结构（对应报告 JSON 数组的单个元素）
#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    pub file: String,
    pub size: u64,
    pub report: SecurityReport,
}

/// 单个文件的处理结果：None 表示跳过（读取失败或超出大小限制）
type Outcome = Option<ScanRecord>;

/// 扫描目录并将结果以 JSON 数组流式写入 `out`
/// 稳定性保证：先收集文件并按文件名排序，并行结果按索引重排后输出
pub fn scan_and_write(input_dir: &Path, out: &mut dyn Write, opts: &ScanOptions, engine: &Engine) -> Result<ScanStats> {
    let mut files: Vec<PathBuf> = vec![];
    // 只扫描单层目录
    for entry in WalkDir::new(input_dir).min_depth(1).max_depth(1) {
        let entry = match entry { Ok(e) => e, Err(_) => continue };
        if entry.file_type().is_file() { files.push(entry.into_path()); }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    info!(files = files.len(), dir = %input_dir.display(), "starting image scan");

    let threads = opts.threads.unwrap_or_else(num_cpus::get);
    let mut stats = ScanStats::default();
    let mut writer = RecordWriter::new(out);
    writer.begin()?;

    if threads > 1 {
        scan_parallel(&files, &mut writer, opts, engine, &mut stats, threads)?;
    } else {
        for path in &files {
            let outcome = analyze_file(path, opts.max_file_size, engine);
            writer.write(outcome, &mut stats)?;
        }
    }

    writer.end()?;
    info!(
        files_scanned = stats.files_scanned,
        files_skipped = stats.files_skipped,
        suspicious = stats.suspicious,
        warnings = stats.warnings,
        "image scan finished"
    );
    Ok(stats)
}

/// 读取并评估单个文件
fn analyze_file(path: &Path, max_file_size: Option<u64>, engine: &Engine) -> Outcome {
    let file = path.file_name().and_then(|s| s.to_str())?.to_string();
    let size = std::fs::metadata(path).ok()?.len();
    if let Some(max) = max_file_size {
        if size > max {
            debug!(%file, size, max, "skipping oversized file");
            return None;
        }
    }
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            debug!(%file, error = %e, "skipping unreadable file");
            return None;
        }
    };
    let report = engine.analyze_named(&bytes, &file);
    Some(ScanRecord { file, size, report })
}

/// 流式 JSON 数组写出
struct RecordWriter<'a> {
    out: &'a mut dyn Write,
    first: bool,
}

impl<'a> RecordWriter<'a> {
    fn new(out: &'a mut dyn Write) -> Self {
        Self { out, first: true }
    }

    fn begin(&mut self) -> Result<()> {
        write!(self.out, "[")?;
        Ok(())
    }

    fn write(&mut self, outcome: Outcome, stats: &mut ScanStats) -> Result<()> {
        let rec = match outcome {
            Some(r) => r,
            None => {
                stats.files_skipped += 1;
                return Ok(());
            }
        };
        stats.files_scanned += 1;
        match rec.report.status {
            SecurityStatus::Suspicious => stats.suspicious += 1,
            SecurityStatus::Warning => stats.warnings += 1,
            SecurityStatus::Clean => {}
        }
        if !self.first { write!(self.out, ",")?; } else { self.first = false; }
        serde_json::to_writer(&mut *self.out, &rec)?;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        write!(self.out, "]")?;
        Ok(())
    }
}

/// 并行调度：
/// - 使用 Rayon 线程池并行评估
/// - 单线程 Writer 按 idx 重排并流式写 JSON，保证稳定顺序
fn scan_parallel(
    files: &[PathBuf],
    writer: &mut RecordWriter<'_>,
    opts: &ScanOptions,
    engine: &Engine,
    stats: &mut ScanStats,
    threads: usize,
) -> Result<()> {
    use crossbeam_channel as channel;
    use rayon::prelude::*;
    use std::collections::BTreeMap;

    let (tx, rx) = channel::bounded::<(usize, Outcome)>(256);

    // Writer 保持在当前线程，评估在后台线程内的 Rayon 线程池执行
    let engine = Arc::new(engine.clone());
    let max_file_size = opts.max_file_size;
    let files_vec: Vec<(usize, PathBuf)> = files.iter().cloned().enumerate().collect();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;

    let scan_thread = std::thread::spawn(move || {
        pool.install(|| {
            files_vec.par_iter().for_each_with(tx, |tx, (idx, path)| {
                let outcome = analyze_file(path, max_file_size, &engine);
                let _ = tx.send((*idx, outcome));
            });
        });
        // 结束后 Sender 全部被丢弃，Receiver 将收到关闭信号
    });

    let mut next_idx: usize = 0;
    let mut buffer: BTreeMap<usize, Outcome> = BTreeMap::new();
    while let Ok((idx, outcome)) = rx.recv() {
        buffer.insert(idx, outcome);
        // 从 next_idx 开始顺序冲刷
        while let Some(outcome) = buffer.remove(&next_idx) {
            writer.write(outcome, stats)?;
            next_idx += 1;
        }
    }

    if scan_thread.join().is_err() {
        anyhow::bail!("scan worker panicked");
    }
    Ok(())
}
