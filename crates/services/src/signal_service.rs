//! 信号流水线服务
//!
//! 数据源链 → 指标快照 + 形态 → Quant / Analyst → Reflex 共识 → 置信度下限
//! → 紧急停止与纪律检查 → 仓位建议 → 通知
//!
//! 同一 (品种, 周期) 的调用串行执行，缓存期内重复请求返回同一个信号。
//! 纪律、风控、账本、历史在 `Governance` 中由一把锁保护，发信号与结算共用。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sniper_ai_analysis::{LanguageModel, OpenAiChatClient, UnavailableModel};
use sniper_common::{Clock, EnumAsStrTrait, Strength, Symbol, SystemClock, Timeframe, TradeResult};
use sniper_indicators::{IndicatorEngine, PatternDetector, TrendBias};
use sniper_infrastructure::{CacheProvider, InMemoryCache, StateStore};
use sniper_market::{CandleBatch, CandleSeriesStore, IngestReport, MarketDataChain};
use sniper_risk::{
    AssessmentInput, DisciplineDecision, DisciplineState, EmergencyStop, EmergencyStopEvent,
    LedgerStats, RiskAssessment, TradeOutcome, TradeRecord,
};
use sniper_strategies::{
    build_reasons, AnalysisInput, AnalystEstimator, ApprovalGate, ConfluenceReport,
    ConsensusResolver, EntryTiming, ModelApprovalGate, QuantEstimator, RuleApprovalGate,
    TimeframeAgreement, TimeframeTrend,
};

use crate::config::{SignalTarget, SniperConfig};
use crate::governance::Governance;
use crate::notification::{LogNotifier, SignalNotifier, TelegramNotifier};
use crate::signal::{Signal, SignalOutcome, WithheldReason};

/// 结算结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeReport {
    pub record: TradeRecord,
    pub emergency: Option<EmergencyStopEvent>,
    pub loss_streak: u32,
    pub account_balance: f64,
}

/// 运行状态快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub uptime_ms: i64,
    pub signals_emitted: u64,
    pub signals_withheld: u64,
    pub no_data: u64,
    pub providers: Vec<String>,
    pub emergency_stop: EmergencyStop,
    pub discipline: DisciplineState,
    pub account_balance: f64,
    pub ledger: LedgerStats,
    pub history_len: usize,
}

#[derive(Default)]
struct Counters {
    emitted: AtomicU64,
    withheld: AtomicU64,
    no_data: AtomicU64,
}

pub struct SignalService {
    config: SniperConfig,
    chain: Arc<MarketDataChain>,
    series: Arc<CandleSeriesStore>,
    indicator_engine: IndicatorEngine,
    pattern_detector: PatternDetector,
    quant: QuantEstimator,
    analyst: AnalystEstimator,
    resolver: ConsensusResolver,
    governance: Mutex<Governance>,
    state_store: Arc<dyn StateStore>,
    cache: InMemoryCache<Signal>,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
    notifiers: Vec<Arc<dyn SignalNotifier>>,
    clock: Arc<dyn Clock>,
    started_at: i64,
    counters: Counters,
}

impl SignalService {
    /// 依赖全部由调用方注入
    pub async fn new(
        config: SniperConfig,
        chain: Arc<MarketDataChain>,
        series: Arc<CandleSeriesStore>,
        model: Arc<dyn LanguageModel>,
        approval_gate: Arc<dyn ApprovalGate>,
        state_store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let indicator_engine = IndicatorEngine::new(config.indicators.clone())
            .context("指标周期配置无效")?;
        let governance = Governance::load(
            state_store.as_ref(),
            config.discipline.clone(),
            config.risk.clone(),
            config.ledger.clone(),
            config.signal.history_limit,
        )
        .await
        .context("加载治理状态失败")?;
        let analyst = AnalystEstimator::new(model, Duration::from_millis(config.llm.timeout_ms));
        let resolver = ConsensusResolver::new(config.consensus.clone(), approval_gate);
        let cache = InMemoryCache::new(Some(Duration::from_millis(
            config.signal.cache_ttl_ms.max(0) as u64,
        )));
        let started_at = clock.now_ms();

        Ok(Self {
            config,
            chain,
            series,
            indicator_engine,
            pattern_detector: PatternDetector::new(),
            quant: QuantEstimator::new(),
            analyst,
            resolver,
            governance: Mutex::new(governance),
            state_store,
            cache,
            key_locks: DashMap::new(),
            notifiers: Vec::new(),
            clock,
            started_at,
            counters: Counters::default(),
        })
    }

    /// 按配置装配完整服务：内置数据源、OpenAI 兼容模型（未配置时降级为规则）、日志与 Telegram 通知
    pub async fn from_config(config: SniperConfig, state_store: Arc<dyn StateStore>) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let series = Arc::new(CandleSeriesStore::new(config.market.max_series_len));
        let chain = Arc::new(MarketDataChain::from_config(
            &config.market,
            series.clone(),
            clock.clone(),
        ));

        let model: Arc<dyn LanguageModel> = if config.llm.is_configured() {
            Arc::new(OpenAiChatClient::new(&config.llm).context("创建 LLM 客户端失败")?)
        } else {
            warn!("未配置 LLM_API_KEY，Analyst 将使用技术指标回退");
            Arc::new(UnavailableModel)
        };

        let rule_gate = RuleApprovalGate::new(config.consensus.fallback_approval_confidence);
        let approval_gate: Arc<dyn ApprovalGate> =
            if config.llm.enable_approval && config.llm.is_configured() {
                Arc::new(ModelApprovalGate::new(
                    model.clone(),
                    Duration::from_millis(config.llm.timeout_ms),
                    rule_gate,
                ))
            } else {
                Arc::new(rule_gate)
            };

        let mut service = Self::new(
            config,
            chain,
            series,
            model,
            approval_gate,
            state_store,
            clock,
        )
        .await?
        .with_notifier(Arc::new(LogNotifier));

        match TelegramNotifier::from_env() {
            Ok(telegram) => {
                info!("已启用 Telegram 通知");
                service = service.with_notifier(Arc::new(telegram));
            }
            Err(e) => debug!("Telegram 通知未启用: {}", e),
        }
        Ok(service)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn SignalNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn config(&self) -> &SniperConfig {
        &self.config
    }

    fn cache_key(symbol: &Symbol, timeframe: Timeframe) -> String {
        format!("{}:{}", symbol.key(), timeframe.as_str())
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// 抓取端推送K线：合并进序列并让该键的行情缓存失效
    pub fn ingest_candles(&self, batch: CandleBatch) -> IngestReport {
        let symbol = Symbol::parse(&batch.asset);
        let timeframe = Timeframe::parse_or_default(&batch.timeframe);
        let report = self.series.ingest(batch);
        if report.accepted > 0 {
            self.chain.invalidate(&symbol, timeframe);
        }
        report
    }

    /// 跑一次完整流水线
    pub async fn generate_signal(&self, raw_symbol: &str, timeframe: Timeframe) -> Result<SignalOutcome> {
        let symbol = Symbol::parse(raw_symbol);
        let key = Self::cache_key(&symbol, timeframe);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let now = self.clock.now_ms();
        if let Some(signal) = self.cache.get(&key).await? {
            if now - signal.timestamp < self.config.signal.cache_ttl_ms {
                debug!("信号缓存命中 {}", key);
                return Ok(SignalOutcome::Cached(signal));
            }
            self.cache.delete(&key).await?;
        }

        let data = match self.chain.fetch(&symbol, timeframe).await {
            Ok(data) => data,
            Err(e) => {
                warn!("{} 无可用行情: {}", key, e);
                self.counters.no_data.fetch_add(1, Ordering::Relaxed);
                return Ok(SignalOutcome::NoData);
            }
        };

        let snapshot = self
            .indicator_engine
            .compute(&data.candles)
            .context("指标计算失败")?;
        let patterns = self.pattern_detector.detect(&data.candles, timeframe);
        let agreement = self
            .timeframe_agreement(&symbol, timeframe, snapshot.trend)
            .await;
        let input = AnalysisInput {
            symbol: symbol.clone(),
            timeframe,
            snapshot,
            patterns,
        };

        let quant = self.quant.estimate(&input);
        let analyst = self.analyst.estimate(&input).await;
        let outcome = self.resolver.resolve(&symbol, timeframe, &quant, &analyst).await;
        let confidence = outcome.confidence_pct();

        let floor = self.resolver.config().min_confidence_floor;
        if confidence < floor {
            return Ok(self.withhold(
                &key,
                WithheldReason::BelowConfidenceFloor { confidence, floor },
            ));
        }

        let mut gov = self.governance.lock().await;
        let now = self.clock.now_ms();
        let today = self.clock.today();

        if gov.ledger.is_emergency_active() {
            let reason = gov.ledger.emergency().reason.clone();
            return Ok(self.withhold(&key, WithheldReason::EmergencyStop { reason }));
        }

        let before = gov.discipline.state().clone();
        let decision = gov.discipline.evaluate(now, today);
        if gov.discipline.state() != &before {
            gov.save_discipline(self.state_store.as_ref())
                .await
                .context("保存纪律状态失败")?;
        }
        if let DisciplineDecision::Blocked {
            reason,
            pause_started,
        } = decision
        {
            return Ok(self.withhold(
                &key,
                WithheldReason::Discipline {
                    reason,
                    pause_started,
                },
            ));
        }

        let volatility = input.snapshot.volatility;
        let position = gov.risk.recommend(confidence, volatility);
        let risk_assessment = RiskAssessment::assess(&AssessmentInput {
            confidence_pct: confidence,
            volatility,
            data_stale: data.stale,
            analyst_degraded: analyst.is_degraded(),
            loss_streak: gov.discipline.state().loss_streak,
        });
        let confluence = ConfluenceReport::analyze(&input.snapshot, &input.patterns);
        let reasons = build_reasons(&outcome, &quant, &analyst, &input.patterns, &agreement);
        let entry_timing = EntryTiming::plan(timeframe, now, &input.patterns);

        let signal = Signal {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.clone(),
            timeframe,
            direction: outcome.direction,
            confidence,
            quality: outcome.quality,
            strength: Strength::from_confidence(confidence),
            consensus: outcome.consensus,
            reasons,
            risk_assessment,
            position,
            confluence,
            timeframe_agreement: agreement,
            entry_timing,
            analyst_degraded: analyst.is_degraded(),
            data_stale: data.stale,
            data_source: data.source.clone(),
            timestamp: now,
            expiry: now + self.config.signal.expiry_ms,
        };

        gov.discipline.record_signal_shown(now, today);
        gov.ledger.append(TradeRecord::pending(
            &signal.id,
            now,
            signal.direction,
            signal.position.amount,
            &symbol.key(),
            timeframe,
            confidence,
        ));
        gov.push_history(signal.clone());
        let store = self.state_store.as_ref();
        gov.save_discipline(store).await.context("保存纪律状态失败")?;
        gov.save_ledger(store).await.context("保存交易账本失败")?;
        gov.save_history(store).await.context("保存信号历史失败")?;
        drop(gov);

        self.cache.set(&key, &signal, None).await?;
        self.counters.emitted.fetch_add(1, Ordering::Relaxed);
        info!(
            "✅ 信号 {} {} 置信度={:.1} 质量={} 共识={:?} 数据源={}{}",
            key,
            signal.direction,
            signal.confidence,
            signal.quality.as_str(),
            signal.consensus,
            signal.data_source,
            if signal.data_stale { " (stale)" } else { "" }
        );

        self.notify_signal(&signal).await;
        Ok(SignalOutcome::Emitted(signal))
    }

    /// 配置周期的趋势一致性；主周期沿用本次快照，其余周期取不到数据或指标算不出时跳过
    async fn timeframe_agreement(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        primary: TrendBias,
    ) -> TimeframeAgreement {
        let others: Vec<Timeframe> = self
            .config
            .signal
            .agreement_timeframes
            .iter()
            .copied()
            .filter(|tf| *tf != timeframe)
            .collect();
        let fetched = join_all(others.iter().map(|tf| self.chain.fetch(symbol, *tf))).await;

        let mut trends = vec![TimeframeTrend {
            timeframe,
            trend: primary,
        }];
        for (tf, result) in others.into_iter().zip(fetched) {
            let data = match result {
                Ok(data) => data,
                Err(e) => {
                    debug!("{} {} 不参与多周期统计: {}", symbol, tf, e);
                    continue;
                }
            };
            match self.indicator_engine.compute(&data.candles) {
                Ok(snapshot) => trends.push(TimeframeTrend {
                    timeframe: tf,
                    trend: snapshot.trend,
                }),
                Err(e) => debug!("{} {} 指标计算失败，跳过: {}", symbol, tf, e),
            }
        }
        TimeframeAgreement::analyze(&trends)
    }

    fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.config.signal.notify_timeout_ms.max(1) as u64)
    }

    /// 逐个通知，单个通知器超时或失败只记日志
    async fn notify_signal(&self, signal: &Signal) {
        for notifier in &self.notifiers {
            match timeout(self.notify_timeout(), notifier.notify_signal(signal)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("通知 {} 发送失败: {}", notifier.name(), e),
                Err(_) => warn!("通知 {} 超时，已跳过", notifier.name()),
            }
        }
    }

    async fn notify_emergency(&self, event: &EmergencyStopEvent) {
        for notifier in &self.notifiers {
            match timeout(self.notify_timeout(), notifier.notify_emergency(event)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("通知 {} 发送失败: {}", notifier.name(), e),
                Err(_) => warn!("通知 {} 超时，已跳过", notifier.name()),
            }
        }
    }

    fn withhold(&self, key: &str, reason: WithheldReason) -> SignalOutcome {
        info!("信号被拦截 {}: {}", key, reason);
        self.counters.withheld.fetch_add(1, Ordering::Relaxed);
        SignalOutcome::Withheld(reason)
    }

    /// 并发跑多个目标，结果顺序与输入一致
    pub async fn generate_batch(&self, targets: &[SignalTarget]) -> Vec<(SignalTarget, Result<SignalOutcome>)> {
        let runs = targets.iter().map(|target| async move {
            let raw = target.symbol.key();
            let result = self.generate_signal(&raw, target.timeframe).await;
            (target.clone(), result)
        });
        join_all(runs).await
    }

    /// 交易结果回调：结算账本，更新纪律与风控，必要时触发紧急停止
    pub async fn record_trade_outcome(&self, outcome: TradeOutcome) -> Result<OutcomeReport> {
        if !outcome.result.is_settled() {
            anyhow::bail!("交易结果不能是 pending");
        }
        let mut gov = self.governance.lock().await;
        let now = self.clock.now_ms();
        let risk_config = gov.risk.config().clone();

        let record = gov
            .ledger
            .settle(&outcome, now, |result, amount| risk_config.default_profit(result, amount));
        gov.discipline.record_trade_result(record.result);
        gov.risk.record_trade_result(record.result, record.amount);
        let emergency = gov.ledger.check_emergency(now);

        let store = self.state_store.as_ref();
        gov.save_ledger(store).await.context("保存交易账本失败")?;
        gov.save_discipline(store).await.context("保存纪律状态失败")?;
        gov.save_risk(store).await.context("保存风控状态失败")?;

        let report = OutcomeReport {
            record,
            emergency,
            loss_streak: gov.discipline.state().loss_streak,
            account_balance: gov.risk.state().account_balance,
        };
        drop(gov);

        if report.record.result == TradeResult::Loss {
            info!("交易亏损，当前连亏 {}", report.loss_streak);
        }
        if let Some(event) = &report.emergency {
            error!("🛑 连续亏损 {} 次，紧急停止已激活", event.consecutive_losses);
            self.notify_emergency(event).await;
        }
        Ok(report)
    }

    pub async fn activate_emergency(&self, reason: &str) -> Result<EmergencyStop> {
        let mut gov = self.governance.lock().await;
        gov.ledger.activate(reason, self.clock.now_ms());
        gov.save_ledger(self.state_store.as_ref())
            .await
            .context("保存交易账本失败")?;
        Ok(gov.ledger.emergency().clone())
    }

    /// 只复位紧急停止，连亏计数保持不变
    pub async fn reset_emergency(&self) -> Result<EmergencyStop> {
        let mut gov = self.governance.lock().await;
        gov.ledger.reset();
        gov.save_ledger(self.state_store.as_ref())
            .await
            .context("保存交易账本失败")?;
        Ok(gov.ledger.emergency().clone())
    }

    pub async fn emergency_status(&self) -> EmergencyStop {
        self.governance.lock().await.ledger.emergency().clone()
    }

    pub async fn reset_session(&self) -> Result<DisciplineState> {
        let mut gov = self.governance.lock().await;
        gov.discipline.reset_session();
        gov.save_discipline(self.state_store.as_ref())
            .await
            .context("保存纪律状态失败")?;
        info!("交易会话已重置");
        Ok(gov.discipline.state().clone())
    }

    pub async fn recent_signals(&self, n: usize) -> Vec<Signal> {
        self.governance.lock().await.recent_signals(n)
    }

    pub async fn status(&self) -> ServiceStatus {
        let gov = self.governance.lock().await;
        let now = self.clock.now_ms();
        ServiceStatus {
            uptime_ms: now - self.started_at,
            signals_emitted: self.counters.emitted.load(Ordering::Relaxed),
            signals_withheld: self.counters.withheld.load(Ordering::Relaxed),
            no_data: self.counters.no_data.load(Ordering::Relaxed),
            providers: self.chain.provider_names(),
            emergency_stop: gov.ledger.emergency().clone(),
            discipline: gov.discipline.state().clone(),
            account_balance: gov.risk.state().account_balance,
            ledger: gov.ledger.stats(self.clock.today()),
            history_len: gov.history_len(),
        }
    }

    /// 清理过期的信号缓存
    pub fn purge_cache(&self) -> usize {
        self.cache.purge_expired()
    }

    /// 把全部治理状态写回存储，关闭前调用
    pub async fn flush_state(&self) -> Result<()> {
        let gov = self.governance.lock().await;
        gov.save_all(self.state_store.as_ref())
            .await
            .context("写回治理状态失败")?;
        info!("治理状态已写回 backend={}", self.state_store.backend());
        Ok(())
    }
}
