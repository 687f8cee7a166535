// ==========================================
// 检验员分配系统 - 批次生成引擎
// ==========================================
// 职责: 缺口记录 + 优先批次请求 → 有序批次序列
// 输入: 出荷不足记录 / 当日登録品番 / 洗浄依頼 / 先行検査
// 输出: 按处理顺序排列的批次 + 被跳过记录的校验问题
// 红线: 拆分后的批次数量之和 = 缺口数量
// 红线: 优先批次排在所有普通批次之前
// ==========================================

use crate::domain::lot::{duration_minutes, Lot, PriorityLotRequest, ShortageRecord};
use crate::domain::product::ProductCatalog;
use crate::domain::report::ValidationIssue;
use crate::domain::types::{LotOrigin, FIXED_PRIORITY_RANK};
use crate::engine::error::ValidationError;
use std::collections::{BTreeSet, HashSet};
use tracing::instrument;

// ==========================================
// LotBuildInput - 批次生成输入
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct LotBuildInput {
    pub shortages: Vec<ShortageRecord>,
    pub registered_products: BTreeSet<String>,     // 当日登録品番（缺口记录升级为优先）
    pub registered_lots: Vec<PriorityLotRequest>,  // 当日登録批次
    pub cleaning_lots: Vec<PriorityLotRequest>,    // 洗浄依頼
    pub advance_lots: Vec<PriorityLotRequest>,     // 先行検査
}

// ==========================================
// LotBuildOutput - 批次生成结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct LotBuildOutput {
    pub lots: Vec<Lot>,
    pub issues: Vec<ValidationIssue>,
}

// ==========================================
// LotBuilder - 批次生成引擎
// ==========================================
pub struct LotBuilder<'a> {
    catalog: &'a ProductCatalog,
}

impl<'a> LotBuilder<'a> {
    pub fn new(catalog: &'a ProductCatalog) -> Self {
        Self { catalog }
    }

    /// 生成批次序列
    ///
    /// 处理顺序: 优先级升序 → 时长降序 → 批次ID升序
    #[instrument(skip(self, input), fields(
        shortages = input.shortages.len(),
        registered_lots = input.registered_lots.len(),
        cleaning_lots = input.cleaning_lots.len(),
        advance_lots = input.advance_lots.len()
    ))]
    pub fn build(&self, input: &LotBuildInput) -> LotBuildOutput {
        let mut output = LotBuildOutput::default();
        let mut seen_ids: HashSet<String> = HashSet::new();

        let priority_sources = [
            (&input.registered_lots, LotOrigin::SameDayRegistered),
            (&input.cleaning_lots, LotOrigin::CleaningRequest),
            (&input.advance_lots, LotOrigin::AdvanceInspection),
        ];
        for (requests, origin) in priority_sources {
            for request in requests.iter() {
                match self.lots_from_request(request, origin) {
                    Ok(lots) => push_unique(&mut output, &mut seen_ids, lots, &request.lot_id),
                    Err(err) => record_issue(&mut output, &request.lot_id, &request.product_id, err),
                }
            }
        }

        for (idx, record) in input.shortages.iter().enumerate() {
            let record_ref = format!("shortage#{}", idx + 1);
            let origin = if input.registered_products.contains(&record.product_id) {
                LotOrigin::SameDayRegistered
            } else {
                LotOrigin::Ordinary
            };
            match self.lots_from_shortage(idx, record, origin) {
                Ok(lots) => push_unique(&mut output, &mut seen_ids, lots, &record_ref),
                Err(err) => record_issue(&mut output, &record_ref, &record.product_id, err),
            }
        }

        output.lots.sort_by_key(|lot| lot.processing_key());

        tracing::info!(
            lot_count = output.lots.len(),
            issue_count = output.issues.len(),
            "批次生成完成"
        );
        output
    }

    // ==========================================
    // 内部方法
    // ==========================================

    fn lots_from_shortage(
        &self,
        idx: usize,
        record: &ShortageRecord,
        origin: LotOrigin,
    ) -> Result<Vec<Lot>, ValidationError> {
        let (seconds_per_unit, parts) = self.resolve(
            &record.product_id,
            record.process_id.as_deref(),
            record.shortage_quantity,
        )?;

        Ok(parts
            .into_iter()
            .enumerate()
            .map(|(seq, quantity)| Lot {
                lot_id: format!("SH{:04}-{}-{:02}", idx + 1, record.product_id, seq + 1),
                product_id: record.product_id.clone(),
                process_id: record.process_id.clone(),
                quantity,
                origin,
                priority_rank: origin.priority_rank(),
                duration_minutes: duration_minutes(quantity, seconds_per_unit),
                seconds_per_unit,
                fixed_inspector_id: None,
                shipment_date: record.shipment_date,
            })
            .collect())
    }

    fn lots_from_request(
        &self,
        request: &PriorityLotRequest,
        origin: LotOrigin,
    ) -> Result<Vec<Lot>, ValidationError> {
        let (seconds_per_unit, parts) = self.resolve(
            &request.product_id,
            request.process_id.as_deref(),
            request.quantity,
        )?;

        let fixed_inspector_id = request
            .fixed_inspector_id
            .clone()
            .filter(|id| !id.trim().is_empty());
        let priority_rank = if fixed_inspector_id.is_some() {
            FIXED_PRIORITY_RANK
        } else {
            origin.priority_rank()
        };
        let split = parts.len() > 1;

        Ok(parts
            .into_iter()
            .enumerate()
            .map(|(seq, quantity)| Lot {
                lot_id: if split {
                    format!("{}-{:02}", request.lot_id, seq + 1)
                } else {
                    request.lot_id.clone()
                },
                product_id: request.product_id.clone(),
                process_id: request.process_id.clone(),
                quantity,
                origin,
                priority_rank,
                duration_minutes: duration_minutes(quantity, seconds_per_unit),
                seconds_per_unit,
                fixed_inspector_id: fixed_inspector_id.clone(),
                shipment_date: request.shipment_date,
            })
            .collect())
    }

    /// 校验记录并返回 (秒/个, 拆分数量)
    fn resolve(
        &self,
        product_id: &str,
        process_id: Option<&str>,
        quantity: i64,
    ) -> Result<(f64, Vec<i64>), ValidationError> {
        if quantity <= 0 {
            return Err(ValidationError::NonPositiveQuantity {
                product_id: product_id.to_string(),
                quantity,
            });
        }
        if !self.catalog.contains(product_id) {
            return Err(ValidationError::UnknownProduct(product_id.to_string()));
        }

        let seconds_per_unit = self
            .catalog
            .seconds_per_unit(product_id, process_id)
            .unwrap_or(f64::NAN);
        if !(seconds_per_unit.is_finite() && seconds_per_unit > 0.0) {
            return Err(ValidationError::InvalidThroughput {
                product_id: product_id.to_string(),
                seconds_per_unit,
            });
        }

        let capacity = self.catalog.lot_capacity(product_id);
        if capacity == Some(0) {
            return Err(ValidationError::InvalidLotCapacity(product_id.to_string()));
        }

        Ok((seconds_per_unit, split_quantity(quantity, capacity)))
    }
}

/// 按单批容量拆分数量
///
/// 批次数 = ceil(数量 / 容量)，前几批为满容量，最后一批为余数。
/// 容量缺失时整批不拆分。
pub fn split_quantity(quantity: i64, capacity: Option<u32>) -> Vec<i64> {
    if quantity <= 0 {
        return Vec::new();
    }
    let cap = capacity
        .map(i64::from)
        .filter(|c| *c > 0)
        .unwrap_or(quantity);
    let count = (quantity + cap - 1) / cap;
    (0..count)
        .map(|i| {
            if i + 1 < count {
                cap
            } else {
                quantity - cap * (count - 1)
            }
        })
        .collect()
}

fn push_unique(
    output: &mut LotBuildOutput,
    seen_ids: &mut HashSet<String>,
    lots: Vec<Lot>,
    record_ref: &str,
) {
    if let Some(dup) = lots.iter().find(|lot| seen_ids.contains(&lot.lot_id)) {
        let err = ValidationError::DuplicateLotId(dup.lot_id.clone());
        let product_id = dup.product_id.clone();
        record_issue(output, record_ref, &product_id, err);
        return;
    }
    for lot in lots {
        seen_ids.insert(lot.lot_id.clone());
        output.lots.push(lot);
    }
}

fn record_issue(output: &mut LotBuildOutput, record_ref: &str, product_id: &str, err: ValidationError) {
    tracing::warn!(
        record_ref = record_ref,
        product_id = product_id,
        error = %err,
        "记录校验失败，已跳过"
    );
    output.issues.push(ValidationIssue {
        record_ref: record_ref.to_string(),
        product_id: product_id.to_string(),
        reason: err.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::ProductMaster;

    fn catalog() -> ProductCatalog {
        ProductCatalog::from_rows(vec![
            ProductMaster {
                product_id: "P".to_string(),
                process_id: None,
                seconds_per_unit: 108.0,
                lot_capacity: Some(50),
            },
            ProductMaster {
                product_id: "Q".to_string(),
                process_id: None,
                seconds_per_unit: 60.0,
                lot_capacity: None,
            },
        ])
    }

    #[test]
    fn test_split_quantity() {
        assert_eq!(split_quantity(130, Some(50)), vec![50, 50, 30]);
        assert_eq!(split_quantity(100, Some(50)), vec![50, 50]);
        assert_eq!(split_quantity(7, None), vec![7]);
        assert_eq!(split_quantity(7, Some(0)), vec![7]);
        assert!(split_quantity(0, Some(5)).is_empty());
    }

    #[test]
    fn test_shortage_split_partitions_quantity() {
        let catalog = catalog();
        let input = LotBuildInput {
            shortages: vec![ShortageRecord::new("P", None, 130)],
            ..Default::default()
        };
        let output = LotBuilder::new(&catalog).build(&input);

        assert!(output.issues.is_empty());
        let quantities: Vec<i64> = output.lots.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![50, 50, 30]);
        assert_eq!(quantities.iter().sum::<i64>(), 130);
        assert_eq!(output.lots[0].lot_id, "SH0001-P-01");
        assert_eq!(output.lots[0].duration_minutes, 90);
        assert_eq!(output.lots[2].duration_minutes, 54);
    }

    #[test]
    fn test_invalid_records_are_skipped() {
        let catalog = catalog();
        let input = LotBuildInput {
            shortages: vec![
                ShortageRecord::new("P", None, 0),
                ShortageRecord::new("UNKNOWN", None, 10),
                ShortageRecord::new("Q", None, 5),
            ],
            ..Default::default()
        };
        let output = LotBuilder::new(&catalog).build(&input);

        assert_eq!(output.lots.len(), 1);
        assert_eq!(output.issues.len(), 2);
        assert_eq!(output.issues[0].record_ref, "shortage#1");
        assert_eq!(output.issues[1].product_id, "UNKNOWN");
    }

    #[test]
    fn test_priority_lots_come_first() {
        let catalog = catalog();
        let input = LotBuildInput {
            shortages: vec![
                ShortageRecord::new("Q", None, 300),
                ShortageRecord::new("P", None, 10),
            ],
            registered_products: ["P".to_string()].into_iter().collect(),
            cleaning_lots: vec![PriorityLotRequest::new("CL-1", "Q", 5)],
            advance_lots: vec![PriorityLotRequest::new("AD-1", "Q", 6).with_fixed_inspector("V001")],
            ..Default::default()
        };
        let output = LotBuilder::new(&catalog).build(&input);

        let order: Vec<(&str, u8)> = output
            .lots
            .iter()
            .map(|l| (l.lot_id.as_str(), l.priority_rank))
            .collect();
        assert_eq!(
            order,
            vec![
                ("AD-1", 0),
                ("SH0002-P-01", 1),
                ("CL-1", 2),
                ("SH0001-Q-01", 3),
            ]
        );
        assert_eq!(output.lots[1].origin, LotOrigin::SameDayRegistered);
    }

    #[test]
    fn test_split_priority_request_suffix() {
        let catalog = catalog();
        let input = LotBuildInput {
            cleaning_lots: vec![PriorityLotRequest::new("CL-9", "P", 60)],
            ..Default::default()
        };
        let output = LotBuilder::new(&catalog).build(&input);

        let ids: Vec<&str> = output.lots.iter().map(|l| l.lot_id.as_str()).collect();
        assert_eq!(ids, vec!["CL-9-01", "CL-9-02"]);
    }

    #[test]
    fn test_duplicate_lot_id_reported() {
        let catalog = catalog();
        let input = LotBuildInput {
            cleaning_lots: vec![PriorityLotRequest::new("X-1", "Q", 5)],
            advance_lots: vec![PriorityLotRequest::new("X-1", "Q", 7)],
            ..Default::default()
        };
        let output = LotBuilder::new(&catalog).build(&input);

        assert_eq!(output.lots.len(), 1);
        assert_eq!(output.issues.len(), 1);
        assert!(output.issues[0].reason.contains("X-1"));
    }
}
