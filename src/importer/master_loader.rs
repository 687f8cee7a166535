// ==========================================
// 检验员分配系统 - 主数据加载器
// ==========================================
// 职责: 从数据目录加载各类主数据并组装为引擎输入
// 并发: 各数据源相互独立，在 spawn_blocking 中并行解析，
//       全部完成后再合并；单个数据源失败记为 PartialData，不影响其它数据源
// 文件: 每个数据源按 <名称>.csv → <名称>.xlsx 的顺序查找
// ==========================================

use crate::domain::inspector::{Inspector, TabooEntry, WorkShift};
use crate::domain::lot::{PriorityLotRequest, ShortageRecord};
use crate::domain::product::{ProductCatalog, ProductMaster};
use crate::domain::skill::SkillMatrix;
use crate::domain::types::{LotOrigin, SkillLevel};
use crate::domain::vacation::{VacationCode, VacationSchedule};
use crate::engine::{EngineInput, LotBuildInput};
use crate::importer::error::{ImportError, ImportResult, SourceFailure};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{RawTable, UniversalFileParser};
use crate::perf::PerfGuard;
use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

// ==========================================
// MasterSource - 数据源
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterSource {
    Products,
    Inspectors,
    Skills,
    Vacations,
    Shortages,
    RegisteredProducts,
    RegisteredLots,
    CleaningLots,
    AdvanceLots,
    TabooHistory,
}

impl MasterSource {
    pub const ALL: [MasterSource; 10] = [
        MasterSource::Products,
        MasterSource::Inspectors,
        MasterSource::Skills,
        MasterSource::Vacations,
        MasterSource::Shortages,
        MasterSource::RegisteredProducts,
        MasterSource::RegisteredLots,
        MasterSource::CleaningLots,
        MasterSource::AdvanceLots,
        MasterSource::TabooHistory,
    ];

    /// 文件名（不含扩展名）
    pub fn file_stem(&self) -> &'static str {
        match self {
            MasterSource::Products => "products",
            MasterSource::Inspectors => "inspectors",
            MasterSource::Skills => "skills",
            MasterSource::Vacations => "vacations",
            MasterSource::Shortages => "shortages",
            MasterSource::RegisteredProducts => "registered_products",
            MasterSource::RegisteredLots => "registered_lots",
            MasterSource::CleaningLots => "cleaning_lots",
            MasterSource::AdvanceLots => "advance_lots",
            MasterSource::TabooHistory => "taboo_history",
        }
    }

    /// 必需数据源缺失时报错，可选数据源缺失视为空
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            MasterSource::Products
                | MasterSource::Inspectors
                | MasterSource::Skills
                | MasterSource::Shortages
        )
    }
}

// ==========================================
// MasterData - 合并后的主数据
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct MasterData {
    pub catalog: ProductCatalog,
    pub inspectors: Vec<Inspector>,
    pub skills: SkillMatrix,
    pub vacations: VacationSchedule,
    pub lots: LotBuildInput,
}

impl MasterData {
    pub fn into_engine_input(self, run_date: NaiveDate) -> EngineInput {
        EngineInput {
            run_date,
            catalog: self.catalog,
            inspectors: self.inspectors,
            skills: self.skills,
            vacations: self.vacations,
            lots: self.lots,
        }
    }
}

// ==========================================
// MasterLoadOutcome - 加载结果（含部分失败）
// ==========================================
#[derive(Debug)]
pub struct MasterLoadOutcome {
    pub master: MasterData,
    pub failures: Vec<SourceFailure>,
}

impl MasterLoadOutcome {
    /// 任一数据源失败时返回 PartialData
    pub fn into_complete(self) -> ImportResult<MasterData> {
        if self.failures.is_empty() {
            Ok(self.master)
        } else {
            Err(ImportError::PartialData {
                failures: self.failures,
            })
        }
    }
}

/// 单个数据源的解析结果
#[derive(Debug)]
enum Loaded {
    Products(Vec<ProductMaster>),
    Inspectors(Vec<Inspector>),
    Skills(SkillMatrix),
    Vacations(VacationSchedule),
    Shortages(Vec<ShortageRecord>),
    RegisteredProducts(BTreeSet<String>),
    PriorityLots(LotOrigin, Vec<PriorityLotRequest>),
    TabooHistory(Vec<(String, TabooEntry)>),
}

// ==========================================
// MasterDataLoader - 主数据加载器
// ==========================================
pub struct MasterDataLoader {
    data_dir: PathBuf,
}

impl MasterDataLoader {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// 查找数据源文件（.csv 优先）
    pub fn resolve_path(&self, source: MasterSource) -> Option<PathBuf> {
        ["csv", "xlsx", "xls"]
            .iter()
            .map(|ext| self.data_dir.join(format!("{}.{}", source.file_stem(), ext)))
            .find(|p| p.exists())
    }

    /// 并发加载全部数据源
    pub async fn load_all(&self) -> MasterLoadOutcome {
        let mut perf = PerfGuard::new("load_master_data");

        let tasks = MasterSource::ALL.iter().map(|&source| {
            let path = self.resolve_path(source);
            async move {
                let joined =
                    tokio::task::spawn_blocking(move || load_source(source, path.as_deref())).await;
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => Err(ImportError::TaskJoinError(e.to_string())),
                };
                (source, result)
            }
        });
        let results = join_all(tasks).await;

        let mut master = MasterData::default();
        let mut failures = Vec::new();
        let mut catalog_rows = Vec::new();
        let mut taboo = Vec::new();

        for (source, result) in results {
            match result {
                Ok(Loaded::Products(rows)) => catalog_rows = rows,
                Ok(Loaded::Inspectors(inspectors)) => master.inspectors = inspectors,
                Ok(Loaded::Skills(skills)) => master.skills = skills,
                Ok(Loaded::Vacations(vacations)) => master.vacations = vacations,
                Ok(Loaded::Shortages(shortages)) => master.lots.shortages = shortages,
                Ok(Loaded::RegisteredProducts(products)) => {
                    master.lots.registered_products = products
                }
                Ok(Loaded::PriorityLots(origin, lots)) => match origin {
                    LotOrigin::SameDayRegistered => master.lots.registered_lots = lots,
                    LotOrigin::CleaningRequest => master.lots.cleaning_lots = lots,
                    LotOrigin::AdvanceInspection => master.lots.advance_lots = lots,
                    LotOrigin::Ordinary => {}
                },
                Ok(Loaded::TabooHistory(entries)) => taboo = entries,
                Err(err) => {
                    tracing::error!(
                        source = source.file_stem(),
                        error = %err,
                        "主数据加载失败"
                    );
                    failures.push(SourceFailure {
                        source: source.file_stem().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        master.catalog = ProductCatalog::from_rows(catalog_rows);
        attach_taboo_history(&mut master.inspectors, taboo);
        perf.set_items(master.lots.shortages.len() + master.inspectors.len());

        tracing::info!(
            products = master.catalog.len(),
            inspectors = master.inspectors.len(),
            skill_products = master.skills.product_count(),
            vacations = master.vacations.len(),
            shortages = master.lots.shortages.len(),
            failures = failures.len(),
            "主数据加载完成"
        );

        MasterLoadOutcome { master, failures }
    }
}

fn attach_taboo_history(inspectors: &mut [Inspector], entries: Vec<(String, TabooEntry)>) {
    let mut by_inspector: BTreeMap<String, Vec<TabooEntry>> = BTreeMap::new();
    for (inspector_id, entry) in entries {
        by_inspector.entry(inspector_id).or_default().push(entry);
    }
    for inspector in inspectors.iter_mut() {
        if let Some(history) = by_inspector.remove(&inspector.inspector_id) {
            inspector.taboo_history.extend(history);
        }
    }
}

// ==========================================
// 各数据源解析
// ==========================================

fn load_source(source: MasterSource, path: Option<&Path>) -> ImportResult<Loaded> {
    let table = match path {
        Some(p) => UniversalFileParser.parse(p)?,
        None if source.is_required() => {
            return Err(ImportError::FileNotFound(format!(
                "{}.csv / {}.xlsx",
                source.file_stem(),
                source.file_stem()
            )))
        }
        None => RawTable::default(),
    };

    match source {
        MasterSource::Products => parse_products(&table).map(Loaded::Products),
        MasterSource::Inspectors => parse_inspectors(&table).map(Loaded::Inspectors),
        MasterSource::Skills => parse_skills(&table).map(Loaded::Skills),
        MasterSource::Vacations => parse_vacations(&table).map(Loaded::Vacations),
        MasterSource::Shortages => parse_shortages(&table).map(Loaded::Shortages),
        MasterSource::RegisteredProducts => {
            parse_registered_products(&table).map(Loaded::RegisteredProducts)
        }
        MasterSource::RegisteredLots => parse_priority_lots(&table)
            .map(|lots| Loaded::PriorityLots(LotOrigin::SameDayRegistered, lots)),
        MasterSource::CleaningLots => parse_priority_lots(&table)
            .map(|lots| Loaded::PriorityLots(LotOrigin::CleaningRequest, lots)),
        MasterSource::AdvanceLots => parse_priority_lots(&table)
            .map(|lots| Loaded::PriorityLots(LotOrigin::AdvanceInspection, lots)),
        MasterSource::TabooHistory => parse_taboo_history(&table).map(Loaded::TabooHistory),
    }
}

/// 製品マスタ: 品番 / 工程番号 / 検査時間 / ロット数量
pub fn parse_products(table: &RawTable) -> ImportResult<Vec<ProductMaster>> {
    table
        .rows
        .iter()
        .map(|row| {
            let lot_capacity = match FieldMapper::parse_i64(row, "lot_capacity")? {
                None => None,
                Some(v) => Some(u32::try_from(v).map_err(|_| {
                    ImportError::TypeConversionError {
                        row: row.row_number,
                        field: "lot_capacity".to_string(),
                        message: format!("单批容量超出范围: {}", v),
                    }
                })?),
            };
            Ok(ProductMaster {
                product_id: FieldMapper::require_string(row, "product_id")?,
                process_id: FieldMapper::get_string(row, "process_id"),
                seconds_per_unit: FieldMapper::parse_f64(row, "seconds_per_unit")?.ok_or_else(
                    || ImportError::MissingField {
                        row: row.row_number,
                        field: "seconds_per_unit".to_string(),
                    },
                )?,
                lot_capacity,
            })
        })
        .collect()
}

/// 検査員マスタ: 検査員コード / 氏名 / 開始時刻 / 終了時刻 / 稼働分 / 新製品チーム
pub fn parse_inspectors(table: &RawTable) -> ImportResult<Vec<Inspector>> {
    table
        .rows
        .iter()
        .map(|row| {
            let inspector_id = FieldMapper::require_string(row, "inspector_id")?;
            let name = FieldMapper::get_string(row, "name").unwrap_or_else(|| inspector_id.clone());
            let start = FieldMapper::parse_time(row, "start_time")?;
            let end = FieldMapper::parse_time(row, "end_time")?;

            let mut inspector = Inspector::new(&inspector_id, &name);
            inspector.shift = match (start, end) {
                (Some(s), Some(e)) => Some(WorkShift::new(s, e)),
                _ => None,
            };
            inspector.daily_minutes = FieldMapper::parse_i64(row, "daily_minutes")?;
            inspector.new_product_team = FieldMapper::parse_flag(row, "new_product_team");
            Ok(inspector)
        })
        .collect()
}

/// スキルマスタ（宽表）: 品番 / 工程番号 / 各検査員コード列 (1/2/3)
pub fn parse_skills(table: &RawTable) -> ImportResult<SkillMatrix> {
    let inspector_columns: Vec<&String> = table
        .headers
        .iter()
        .filter(|h| !h.is_empty() && !FieldMapper::is_known_column(h, &["product_id", "process_id"]))
        .collect();

    let mut matrix = SkillMatrix::new();
    for row in &table.rows {
        let product_id = FieldMapper::require_string(row, "product_id")?;
        let process_id = FieldMapper::get_string(row, "process_id");
        let levels: BTreeMap<String, SkillLevel> = inspector_columns
            .iter()
            .filter_map(|col| {
                let code = row.values.get(col.as_str())?;
                SkillLevel::from_code(code).map(|level| (col.to_string(), level))
            })
            .collect();
        matrix.add_row(&product_id, process_id.as_deref(), levels);
    }
    Ok(matrix)
}

/// 休暇予定: 検査員コード / 日付 / 休暇区分
pub fn parse_vacations(table: &RawTable) -> ImportResult<VacationSchedule> {
    let mut schedule = VacationSchedule::new();
    for row in &table.rows {
        let inspector_id = FieldMapper::require_string(row, "inspector_id")?;
        let date = FieldMapper::parse_date(row, "date")?.ok_or_else(|| ImportError::MissingField {
            row: row.row_number,
            field: "date".to_string(),
        })?;
        let code = VacationCode::parse(&FieldMapper::get_string(row, "code").unwrap_or_default());
        if code != VacationCode::None {
            schedule.insert(&inspector_id, date, code);
        }
    }
    Ok(schedule)
}

/// 出荷不足: 品番 / 現在工程番号 / 不足数 / 出荷予定日
///
/// 不足数以负数记录时取绝对值；0 保留，由批次生成阶段报告。
pub fn parse_shortages(table: &RawTable) -> ImportResult<Vec<ShortageRecord>> {
    table
        .rows
        .iter()
        .map(|row| {
            let quantity = FieldMapper::parse_i64(row, "shortage_quantity")?.ok_or_else(|| {
                ImportError::MissingField {
                    row: row.row_number,
                    field: "shortage_quantity".to_string(),
                }
            })?;
            Ok(ShortageRecord {
                product_id: FieldMapper::require_string(row, "product_id")?,
                process_id: FieldMapper::get_string(row, "process_id"),
                shortage_quantity: quantity.abs(),
                shipment_date: FieldMapper::parse_date(row, "shipment_date")?,
            })
        })
        .collect()
}

/// 当日登録品番: 品番
pub fn parse_registered_products(table: &RawTable) -> ImportResult<BTreeSet<String>> {
    table
        .rows
        .iter()
        .map(|row| FieldMapper::require_string(row, "product_id"))
        .collect()
}

/// 优先批次: ロットID / 品番 / 工程番号 / 数量 / 固定検査員 / 出荷予定日
pub fn parse_priority_lots(table: &RawTable) -> ImportResult<Vec<PriorityLotRequest>> {
    table
        .rows
        .iter()
        .map(|row| {
            let quantity = FieldMapper::parse_i64(row, "quantity")?.ok_or_else(|| {
                ImportError::MissingField {
                    row: row.row_number,
                    field: "quantity".to_string(),
                }
            })?;
            Ok(PriorityLotRequest {
                lot_id: FieldMapper::require_string(row, "lot_id")?,
                product_id: FieldMapper::require_string(row, "product_id")?,
                process_id: FieldMapper::get_string(row, "process_id"),
                quantity,
                fixed_inspector_id: FieldMapper::get_string(row, "fixed_inspector_id"),
                shipment_date: FieldMapper::parse_date(row, "shipment_date")?,
            })
        })
        .collect()
}

/// 禁忌历史: 検査員コード / 品番 / 割当日時
pub fn parse_taboo_history(table: &RawTable) -> ImportResult<Vec<(String, TabooEntry)>> {
    table
        .rows
        .iter()
        .map(|row| {
            let assigned_at = FieldMapper::parse_datetime(row, "assigned_at")?.ok_or_else(|| {
                ImportError::MissingField {
                    row: row.row_number,
                    field: "assigned_at".to_string(),
                }
            })?;
            Ok((
                FieldMapper::require_string(row, "inspector_id")?,
                TabooEntry {
                    product_id: FieldMapper::require_string(row, "product_id")?,
                    assigned_at,
                },
            ))
        })
        .collect()
}
