//! 命令行定义与一次性命令的执行

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;

use sniper_common::{Direction, Timeframe, TradeResult};
use sniper_market::CandleBatch;
use sniper_risk::TradeOutcome;
use sniper_services::{SignalOutcome, SignalService};

#[derive(Debug, Parser)]
#[command(name = "sniper", version, about = "OTC 二元期权信号共识与风控引擎")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 常驻运行定时信号任务，直到收到退出信号
    Run,
    /// 为一个品种生成一次信号
    Signal {
        /// 例如 EURUSD、"EURUSD OTC"、EURUSD_otc
        symbol: String,
        #[arg(value_parser = parse_timeframe, default_value = "5m")]
        timeframe: Timeframe,
    },
    /// 导入 OTC K线，文件为单个批次或批次数组的 JSON
    Ingest {
        file: PathBuf,
        /// 导入后立即为每个批次生成信号
        #[arg(long)]
        signal: bool,
    },
    /// 上报交易结果
    Outcome(OutcomeArgs),
    /// 紧急停止
    Emergency {
        #[command(subcommand)]
        action: EmergencyAction,
    },
    /// 重置会话计数与暂停
    SessionReset,
    /// 打印运行状态
    Status,
}

#[derive(Debug, Subcommand)]
pub enum EmergencyAction {
    Activate {
        #[arg(long, default_value = "manual")]
        reason: String,
    },
    Reset,
    Status,
}

#[derive(Debug, Args)]
pub struct OutcomeArgs {
    #[arg(long)]
    pub signal_id: Option<String>,
    /// 信号时间戳（毫秒），与 --direction 一起用于匹配
    #[arg(long)]
    pub timestamp: Option<i64>,
    #[arg(long, value_parser = parse_direction)]
    pub direction: Option<Direction>,
    #[arg(long, value_parser = parse_trade_result)]
    pub result: TradeResult,
    #[arg(long)]
    pub profit: Option<f64>,
    #[arg(long)]
    pub amount: Option<f64>,
    #[arg(long)]
    pub asset: Option<String>,
}

impl OutcomeArgs {
    /// 必须能定位到一条记录：signal_id，或 timestamp + direction
    pub fn into_outcome(self) -> Result<TradeOutcome> {
        let identified =
            self.signal_id.is_some() || (self.timestamp.is_some() && self.direction.is_some());
        if !identified {
            bail!("需要 --signal-id，或同时提供 --timestamp 与 --direction");
        }
        Ok(TradeOutcome {
            signal_id: self.signal_id,
            timestamp: self.timestamp,
            direction: self.direction,
            result: self.result,
            profit: self.profit,
            amount: self.amount,
            asset: self.asset,
        })
    }
}

fn parse_timeframe(s: &str) -> Result<Timeframe, String> {
    Timeframe::parse(s).ok_or_else(|| format!("无法识别的周期: {}", s))
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    Direction::from_label(s).ok_or_else(|| format!("无法识别的方向: {}", s))
}

fn parse_trade_result(s: &str) -> Result<TradeResult, String> {
    TradeResult::parse(s).ok_or_else(|| format!("无法识别的交易结果: {}", s))
}

/// 读取K线文件：顶层为数组时按批次数组解析，否则按单个批次
pub async fn load_batches(path: &Path) -> Result<Vec<CandleBatch>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取文件失败: {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("JSON 解析失败: {}", path.display()))?;
    let batches = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(batches)
}

/// 信号结果的 JSON 表示
pub fn outcome_json(outcome: &SignalOutcome) -> Value {
    match outcome {
        SignalOutcome::Emitted(signal) | SignalOutcome::Cached(signal) => json!({
            "outcome": outcome.label(),
            "signal": signal,
        }),
        SignalOutcome::Withheld(reason) => json!({
            "outcome": outcome.label(),
            "reason": reason,
            "message": reason.to_string(),
        }),
        SignalOutcome::NoData => json!({ "outcome": outcome.label() }),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 执行除 `run` 以外的命令
pub async fn dispatch(service: &SignalService, command: Command) -> Result<()> {
    match command {
        Command::Run => Err(anyhow!("run 命令由调度入口处理")),
        Command::Signal { symbol, timeframe } => {
            let outcome = service.generate_signal(&symbol, timeframe).await?;
            print_json(&outcome_json(&outcome))
        }
        Command::Ingest { file, signal } => {
            let batches = load_batches(&file).await?;
            info!("导入K线文件 {} batches={}", file.display(), batches.len());
            let mut results = Vec::with_capacity(batches.len());
            for batch in batches {
                let (asset, timeframe) = (batch.asset.clone(), batch.timeframe.clone());
                let report = service.ingest_candles(batch);
                let mut entry = json!({
                    "asset": asset,
                    "timeframe": timeframe,
                    "report": report,
                });
                if signal {
                    let outcome = service
                        .generate_signal(&asset, Timeframe::parse_or_default(&timeframe))
                        .await?;
                    entry["signal"] = outcome_json(&outcome);
                }
                results.push(entry);
            }
            print_json(&Value::Array(results))
        }
        Command::Outcome(args) => {
            let report = service.record_trade_outcome(args.into_outcome()?).await?;
            print_json(&serde_json::to_value(&report)?)
        }
        Command::Emergency { action } => {
            let state = match action {
                EmergencyAction::Activate { reason } => service.activate_emergency(&reason).await?,
                EmergencyAction::Reset => service.reset_emergency().await?,
                EmergencyAction::Status => service.emergency_status().await,
            };
            print_json(&serde_json::to_value(&state)?)
        }
        Command::SessionReset => {
            let state = service.reset_session().await?;
            print_json(&serde_json::to_value(&state)?)
        }
        Command::Status => {
            let status = service.status().await;
            print_json(&serde_json::to_value(&status)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_signal_command() {
        let cli = Cli::try_parse_from(["sniper", "signal", "EURUSD OTC", "1m"]).unwrap();
        match cli.command {
            Command::Signal { symbol, timeframe } => {
                assert_eq!(symbol, "EURUSD OTC");
                assert_eq!(timeframe, Timeframe::M1);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["sniper", "signal", "GBPUSD"]).unwrap();
        assert!(matches!(cli.command, Command::Signal { timeframe: Timeframe::M5, .. }));

        assert!(Cli::try_parse_from(["sniper", "signal", "GBPUSD", "7m"]).is_err());
    }

    #[test]
    fn test_parse_outcome_command() {
        let cli = Cli::try_parse_from([
            "sniper",
            "outcome",
            "--timestamp",
            "1700000000000",
            "--direction",
            "put",
            "--result",
            "loss",
        ])
        .unwrap();
        let Command::Outcome(args) = cli.command else {
            panic!("expected outcome command");
        };
        let outcome = args.into_outcome().unwrap();
        assert_eq!(outcome.direction, Some(Direction::Down));
        assert_eq!(outcome.result, TradeResult::Loss);
        assert_eq!(outcome.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_outcome_requires_identifier() {
        let cli = Cli::try_parse_from(["sniper", "outcome", "--result", "win"]).unwrap();
        let Command::Outcome(args) = cli.command else {
            panic!("expected outcome command");
        };
        assert!(args.into_outcome().is_err());
    }

    #[test]
    fn test_parse_emergency_activate() {
        let cli =
            Cli::try_parse_from(["sniper", "emergency", "activate", "--reason", "news"]).unwrap();
        match cli.command {
            Command::Emergency {
                action: EmergencyAction::Activate { reason },
            } => assert_eq!(reason, "news"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_single_and_array_batches() {
        let batch = r#"{"asset":"EURUSD_otc","timeframe":"1m","candles":[]}"#;

        let mut single = tempfile::NamedTempFile::new().unwrap();
        write!(single, "{}", batch).unwrap();
        let loaded = load_batches(single.path()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].asset, "EURUSD_otc");

        let mut array = tempfile::NamedTempFile::new().unwrap();
        write!(array, "[{},{}]", batch, batch).unwrap();
        assert_eq!(load_batches(array.path()).await.unwrap().len(), 2);

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        write!(broken, "not json").unwrap();
        assert!(load_batches(broken.path()).await.is_err());
    }

    #[test]
    fn test_no_data_json() {
        assert_eq!(outcome_json(&SignalOutcome::NoData), json!({ "outcome": "no_data" }));
    }
}
