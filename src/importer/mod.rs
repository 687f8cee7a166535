// ==========================================
// 检验员分配系统 - 导入层
// ==========================================
// 职责: 主数据文件 → 规范化内存数据（引擎输入）
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod master_loader;

// 重导出核心类型
pub use error::{ImportError, ImportResult, SourceFailure};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, RawTable, UniversalFileParser};
pub use master_loader::{MasterData, MasterDataLoader, MasterLoadOutcome, MasterSource};
