// ==========================================
// 检验员分配系统 - 字段映射器实现
// ==========================================
// 职责: 源列名（含别名）→ 标准字段 + 类型转换
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRow;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub struct FieldMapper;

impl FieldMapper {
    /// 标准字段的列名别名
    fn aliases(key: &str) -> &'static [&'static str] {
        match key {
            "product_id" => &["品番", "product_id"],
            "process_id" => &["工程番号", "現在工程番号", "process_id"],
            "seconds_per_unit" => &["検査時間", "検査時間(秒/個)", "seconds_per_unit"],
            "lot_capacity" => &["ロット数量", "lot_capacity"],
            "inspector_id" => &["検査員コード", "inspector_id"],
            "name" => &["氏名", "name"],
            "start_time" => &["開始時刻", "start_time"],
            "end_time" => &["終了時刻", "end_time"],
            "daily_minutes" => &["稼働分", "daily_minutes"],
            "new_product_team" => &["新製品チーム", "new_product_team"],
            "date" => &["日付", "date"],
            "code" => &["休暇区分", "code"],
            "shortage_quantity" => &["不足数", "shortage_quantity"],
            "shipment_date" => &["出荷予定日", "shipment_date"],
            "lot_id" => &["ロットID", "lot_id"],
            "quantity" => &["数量", "quantity"],
            "fixed_inspector_id" => &["固定検査員", "fixed_inspector_id"],
            "assigned_at" => &["割当日時", "assigned_at"],
            _ => &[],
        }
    }

    /// 所有别名（用于识别技能表中的非检验员列）
    pub fn is_known_column(header: &str, keys: &[&str]) -> bool {
        keys.iter()
            .any(|key| Self::aliases(key).contains(&header))
    }

    /// 提取字符串字段（空白视为缺失）
    pub fn get_string(row: &RawRow, key: &str) -> Option<String> {
        let aliases = Self::aliases(key);
        let candidates: Vec<&str> = if aliases.is_empty() {
            vec![key]
        } else {
            aliases.to_vec()
        };
        candidates
            .into_iter()
            .filter_map(|alias| row.values.get(alias))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(|v| v.to_string())
    }

    /// 必填字符串字段
    pub fn require_string(row: &RawRow, key: &str) -> ImportResult<String> {
        Self::get_string(row, key).ok_or_else(|| ImportError::MissingField {
            row: row.row_number,
            field: key.to_string(),
        })
    }

    /// 解析浮点数
    pub fn parse_f64(row: &RawRow, key: &str) -> ImportResult<Option<f64>> {
        match Self::get_string(row, key) {
            None => Ok(None),
            Some(value) => value
                .replace(',', "")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ImportError::TypeConversionError {
                    row: row.row_number,
                    field: key.to_string(),
                    message: format!("无法解析为浮点数: {}", value),
                }),
        }
    }

    /// 解析整数（允许 "50.0" 这类 Excel 数值写法）
    pub fn parse_i64(row: &RawRow, key: &str) -> ImportResult<Option<i64>> {
        match Self::parse_f64(row, key)? {
            None => Ok(None),
            Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Ok(Some(v as i64)),
            Some(v) => Err(ImportError::TypeConversionError {
                row: row.row_number,
                field: key.to_string(),
                message: format!("无法解析为整数: {}", v),
            }),
        }
    }

    /// 解析日期（YYYY-MM-DD / YYYY/MM/DD / YYYYMMDD）
    pub fn parse_date(row: &RawRow, key: &str) -> ImportResult<Option<NaiveDate>> {
        match Self::get_string(row, key) {
            None => Ok(None),
            Some(value) => parse_date_str(&value)
                .map(Some)
                .ok_or_else(|| ImportError::DateFormatError {
                    row: row.row_number,
                    field: key.to_string(),
                    value,
                }),
        }
    }

    /// 解析时刻（H:MM / HH:MM:SS）
    pub fn parse_time(row: &RawRow, key: &str) -> ImportResult<Option<NaiveTime>> {
        match Self::get_string(row, key) {
            None => Ok(None),
            Some(value) => NaiveTime::parse_from_str(&value, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M:%S"))
                .map(Some)
                .map_err(|_| ImportError::TypeConversionError {
                    row: row.row_number,
                    field: key.to_string(),
                    message: format!("无法解析为时刻: {}", value),
                }),
        }
    }

    /// 解析日期时刻（YYYY-MM-DD HH:MM[:SS]）
    pub fn parse_datetime(row: &RawRow, key: &str) -> ImportResult<Option<NaiveDateTime>> {
        match Self::get_string(row, key) {
            None => Ok(None),
            Some(value) => ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&value, fmt).ok())
                .map(Some)
                .ok_or_else(|| ImportError::TypeConversionError {
                    row: row.row_number,
                    field: key.to_string(),
                    message: format!("无法解析为日期时刻: {}", value),
                }),
        }
    }

    /// 解析布尔标记（★ / 1 / true / yes / ○）
    pub fn parse_flag(row: &RawRow, key: &str) -> bool {
        Self::get_string(row, key)
            .map(|v| {
                matches!(
                    v.to_lowercase().as_str(),
                    "★" | "1" | "true" | "yes" | "y" | "○"
                )
            })
            .unwrap_or(false)
    }
}

pub fn parse_date_str(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}
