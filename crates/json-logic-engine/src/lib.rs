//! JSON 规则求值引擎
//!
//! 将以 JSON 树编码的声明式规则（"if this then that"）在运行时数据
//! 上下文上求值，规则一次编写、跨平台一致执行。提供：
//! - 递归树解释器 `Evaluator::apply(rule, data)`
//! - 可扩展的操作符注册表（注册 / 覆盖 / 删除自定义操作符）
//! - 30 余个内置操作符：算术、比较、逻辑、字符串、数组组合子、路径取值
//! - 点号路径访问器，区分 "值为 null" 与 "路径不存在"
//!
//! 规则树与数据均为 `serde_json::Value`，由调用方负责解析文本。

pub mod accessor;
pub mod builtins;
pub mod error;
pub mod evaluator;
pub mod registry;

pub use accessor::resolve;
pub use error::{Result, RuleError};
pub use evaluator::Evaluator;
pub use registry::{Operation, Registry};
