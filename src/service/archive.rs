use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::queries;
use crate::error::DocumentError;

/// 归档批处理结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveOutcome {
    /// 命中条件的发票数
    pub examined: usize,
    /// 实际归档数
    pub archived: usize,
    /// 失败/被并发修改跳过数
    pub failed: usize,
}

impl ArchiveOutcome {
    fn new(examined: usize) -> Self {
        Self {
            examined,
            ..Self::default()
        }
    }

    fn tally(&mut self, archived: bool) {
        if archived {
            self.archived += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// 归档截止时间: 当前时间回退 days 天
pub fn archive_cutoff(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

/// 归档超龄未付款发票的维护批处理
///
/// 尽力而为: 单条失败只计数并继续, 不中断整个批次。
pub async fn archive_old_invoices(
    pool: &PgPool,
    days: i64,
) -> Result<ArchiveOutcome, DocumentError> {
    let cutoff = archive_cutoff(Utc::now(), days);
    tracing::info!("查找 {} 天前未付款发票 (早于 {})...", days, cutoff.format("%Y-%m-%d"));

    let ids = queries::list_archivable_ids(pool, cutoff).await?;
    if ids.is_empty() {
        tracing::info!("没有需要归档的发票");
        return Ok(ArchiveOutcome::default());
    }

    let mut outcome = ArchiveOutcome::new(ids.len());
    for invoice_id in ids {
        match queries::archive_invoice(pool, invoice_id).await {
            Ok(affected) if affected > 0 => outcome.tally(true),
            Ok(_) => {
                // 条件行在选出后被并发修改 (如已付款), 不算归档成功
                tracing::warn!("发票 {} 状态已变化, 跳过归档", invoice_id);
                outcome.tally(false);
            }
            Err(e) => {
                tracing::error!("归档发票 {} 失败: {}", invoice_id, e);
                outcome.tally(false);
            }
        }
    }

    tracing::info!(
        "归档完成: 命中 {}, 成功 {}, 失败 {}",
        outcome.examined,
        outcome.archived,
        outcome.failed
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cutoff_moves_back_by_threshold_days() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
        let cutoff = archive_cutoff(now, 60);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 6, 26, 12, 0, 0).unwrap());
    }

    #[test]
    fn outcome_counts_failures_without_dropping_successes() {
        let mut outcome = ArchiveOutcome::new(3);
        outcome.tally(true);
        outcome.tally(false);
        outcome.tally(true);
        assert_eq!(outcome.examined, 3);
        assert_eq!(outcome.archived, 2);
        assert_eq!(outcome.failed, 1);
    }
}
