// ==========================================
// 检验员分配系统 - 検査員マスタ领域模型
// ==========================================
// 职责: 检验员基本信息、班次、禁忌历史
// 规则: 班次跨越午休 (12:15–13:00) 时扣除 60 分钟
// ==========================================

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// 班次缺失时的默认可用分钟数
pub const DEFAULT_SHIFT_MINUTES: i64 = 480;

/// 午休扣除分钟数
const LUNCH_BREAK_MINUTES: i64 = 60;

// ==========================================
// WorkShift - 班次
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkShift {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkShift {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// 默认班次 08:30–17:30（扣除午休后 480 分钟）
    pub fn standard() -> Self {
        Self {
            start: hm(8, 30),
            end: hm(17, 30),
        }
    }

    /// 计算工作分钟数
    ///
    /// # 规则
    /// - end - start
    /// - start <= 12:15 且 end >= 13:00 时扣除 60 分钟
    /// - 结果不小于 0
    pub fn working_minutes(&self) -> i64 {
        let mut minutes = (self.end - self.start).num_minutes();
        if self.start <= hm(12, 15) && self.end >= hm(13, 0) {
            minutes -= LUNCH_BREAK_MINUTES;
        }
        minutes.max(0)
    }

    /// 与给定时间窗的重叠分钟数
    pub fn overlap_minutes(&self, from: NaiveTime, to: NaiveTime) -> i64 {
        let start = self.start.max(from);
        let end = self.end.min(to);
        if start < end {
            (end - start).num_minutes()
        } else {
            0
        }
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

// ==========================================
// TabooEntry - 禁忌历史（品番 + 分配时刻）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabooEntry {
    pub product_id: String,
    pub assigned_at: NaiveDateTime,
}

// ==========================================
// Inspector - 检验员
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspector {
    pub inspector_id: String,            // 検査員コード (V002 等)
    pub name: String,                    // 氏名
    pub shift: Option<WorkShift>,        // 开始/结束时刻
    pub daily_minutes: Option<i64>,      // 显式可用分钟（优先于班次）
    pub new_product_team: bool,          // 新製品チーム (★)
    pub taboo_history: Vec<TabooEntry>,  // 近期分配历史
}

impl Inspector {
    pub fn new(inspector_id: &str, name: &str) -> Self {
        Self {
            inspector_id: inspector_id.to_string(),
            name: name.to_string(),
            shift: None,
            daily_minutes: None,
            new_product_team: false,
            taboo_history: Vec::new(),
        }
    }

    /// 当日基础可用分钟（未扣除休假）
    pub fn base_minutes(&self, default_minutes: i64) -> i64 {
        self.daily_minutes
            .or_else(|| self.shift.map(|s| s.working_minutes()))
            .unwrap_or(default_minutes)
            .max(0)
    }

    /// 用于计算部分休假重叠的班次
    pub fn effective_shift(&self) -> WorkShift {
        self.shift.unwrap_or_else(WorkShift::standard)
    }
}
