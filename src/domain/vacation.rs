// ==========================================
// 检验员分配系统 - 休暇予定领域模型
// ==========================================
// 职责: 休假代码解析 + 不在分钟计算
// 代码表:
//   休 / 出 / 当 → 全天不在（休假标记）
//   AM 08:30–13:00, PM 13:00–17:30, 早 15:00–17:30, 遅 08:30–10:00
//   中 / 空 / 未定义代码 → 无例外勤务
// ==========================================

use crate::domain::inspector::WorkShift;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// VacationCode - 休假代码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VacationCode {
    FullDay,       // 休
    BusinessTrip,  // 出
    SameDayLeave,  // 当
    Morning,       // AM
    Afternoon,     // PM
    LeaveEarly,    // 早
    LateArrival,   // 遅
    None,          // 中 / 空 / 未定义
}

impl VacationCode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "休" => VacationCode::FullDay,
            "出" => VacationCode::BusinessTrip,
            "当" => VacationCode::SameDayLeave,
            "AM" | "am" => VacationCode::Morning,
            "PM" | "pm" => VacationCode::Afternoon,
            "早" => VacationCode::LeaveEarly,
            "遅" => VacationCode::LateArrival,
            _ => VacationCode::None,
        }
    }

    pub fn is_full_day(&self) -> bool {
        matches!(
            self,
            VacationCode::FullDay | VacationCode::BusinessTrip | VacationCode::SameDayLeave
        )
    }

    /// 部分不在时间窗
    pub fn absence_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        let window = |h1, m1, h2, m2| {
            Some((
                NaiveTime::from_hms_opt(h1, m1, 0)?,
                NaiveTime::from_hms_opt(h2, m2, 0)?,
            ))
        };
        match self {
            VacationCode::Morning => window(8, 30, 13, 0),
            VacationCode::Afternoon => window(13, 0, 17, 30),
            VacationCode::LeaveEarly => window(15, 0, 17, 30),
            VacationCode::LateArrival => window(8, 30, 10, 0),
            _ => None,
        }
    }
}

impl fmt::Display for VacationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VacationCode::FullDay => write!(f, "休"),
            VacationCode::BusinessTrip => write!(f, "出"),
            VacationCode::SameDayLeave => write!(f, "当"),
            VacationCode::Morning => write!(f, "AM"),
            VacationCode::Afternoon => write!(f, "PM"),
            VacationCode::LeaveEarly => write!(f, "早"),
            VacationCode::LateArrival => write!(f, "遅"),
            VacationCode::None => write!(f, ""),
        }
    }
}

// ==========================================
// VacationSchedule - 检验员 × 日期 → 休假代码
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct VacationSchedule {
    entries: BTreeMap<(String, NaiveDate), VacationCode>,
}

impl VacationSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, inspector_id: &str, date: NaiveDate, code: VacationCode) {
        self.entries.insert((inspector_id.to_string(), date), code);
    }

    /// 布尔休假标记（全天休假）
    pub fn mark_on_vacation(&mut self, inspector_id: &str, date: NaiveDate) {
        self.insert(inspector_id, date, VacationCode::FullDay);
    }

    pub fn code_for(&self, inspector_id: &str, date: NaiveDate) -> VacationCode {
        self.entries
            .get(&(inspector_id.to_string(), date))
            .copied()
            .unwrap_or(VacationCode::None)
    }

    pub fn is_on_vacation(&self, inspector_id: &str, date: NaiveDate) -> bool {
        self.code_for(inspector_id, date).is_full_day()
    }

    /// 部分休假的不在分钟（与班次的重叠部分）
    ///
    /// 全天休假由 `is_on_vacation` 表达，这里返回整段班次分钟。
    pub fn absence_minutes(&self, inspector_id: &str, date: NaiveDate, shift: &WorkShift) -> i64 {
        let code = self.code_for(inspector_id, date);
        if code.is_full_day() {
            return shift.working_minutes();
        }
        match code.absence_window() {
            Some((from, to)) => shift.overlap_minutes(from, to),
            None => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
