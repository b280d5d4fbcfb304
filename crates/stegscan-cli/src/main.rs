use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stegscan_core::{scan_and_write, Engine, EngineOptions, ScanOptions, SignatureTable};
use tracing::info;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "stegscan", version, about = "LSB 隐写检测与载荷分类")]
struct Cli {
    /// 引擎参数文件（TOML），缺省使用内置校准值
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 语言签名表（TOML），缺省使用内置签名表
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描目录中的图像并生成 JSON 报告
    Scan {
        /// 输入目录
        #[arg(long)]
        input: PathBuf,

        /// 输出文件（JSON 数组）
        #[arg(long, default_value = "./report.json")]
        output: PathBuf,

        /// 线程数（"auto"=CPU 核心数；1 为串行）
        #[arg(long, default_value = "auto")]
        threads: String,

        /// 最大扫描文件大小（单位字节，例如 5242880 代表 5MB）
        #[arg(long)]
        max_file_size: Option<u64>,
    },
    /// 检测单个图像
    Detect { image: PathBuf },
    /// 提取单个图像中的 LSB 载荷
    Extract { image: PathBuf },
    /// 对文本文件分类（"-" 表示标准输入）
    Classify { input: PathBuf },
    /// 检测 + 提取 + 分类的综合报告
    Analyze { image: PathBuf },
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();
    let engine = build_engine(cli.config.as_deref(), cli.rules.as_deref())?;

    match cli.command {
        Commands::Scan { input, output, threads, max_file_size } => {
            info!(?input, ?output, "starting scan");

            // 以缓冲方式打开输出文件，按 JSON 数组流式写入
            let mut out = BufWriter::new(File::create(&output).context("create output file")?);
            let opts = ScanOptions { max_file_size, threads: parse_threads(&threads) };
            let stats = scan_and_write(&input, &mut out, &opts, &engine).context("scan and write failed")?;
            out.flush().context("flush output file")?;

            info!(
                files_scanned = stats.files_scanned,
                suspicious = stats.suspicious,
                warnings = stats.warnings,
                "scan finished"
            );
        }
        Commands::Detect { image } => print_json(&engine.detect(&read_input(&image)?))?,
        Commands::Extract { image } => print_json(&engine.extract(&read_input(&image)?))?,
        Commands::Analyze { image } => print_json(&engine.analyze(&read_input(&image)?))?,
        Commands::Classify { input } => {
            let bytes = read_input(&input)?;
            let text = String::from_utf8_lossy(&bytes);
            print_json(&engine.classify(&text))?;
        }
    }

    Ok(())
}

/// 配置错误在启动期直接失败
fn build_engine(config: Option<&Path>, rules: Option<&Path>) -> Result<Engine> {
    let options = match config {
        Some(p) => {
            let txt = std::fs::read_to_string(p).with_context(|| format!("read config {}", p.display()))?;
            EngineOptions::from_toml_str(&txt).with_context(|| format!("invalid config {}", p.display()))?
        }
        None => EngineOptions::default(),
    };
    let signatures = match rules {
        Some(p) => Arc::new(SignatureTable::load(p).with_context(|| format!("invalid rules {}", p.display()))?),
        None => SignatureTable::builtin(),
    };
    info!(languages = signatures.languages().len(), rules = signatures.rule_count(), "signature table loaded");
    Ok(Engine::new(options, signatures)?)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf).context("read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 日志写到 stderr，避免污染 stdout 上的 JSON
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).with_writer(std::io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析线程参数
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") { return None; }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}
