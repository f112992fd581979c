//! 操作符注册表
//!
//! 使用 DashMap 提供线程安全的操作符名称到实现的映射，支持插入、删除、
//! 查找和批量检视。新建的注册表为空，内置操作符由 Evaluator 构造时填充。

use crate::error::{Result, RuleError};
use crate::evaluator::Evaluator;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// 操作符实现
///
/// 参数为未求值的子规则节点：实现自行决定是否 / 何时对其调用 `apply`，
/// and / or / if 的短路求值就是依赖这一点。
pub type Operation = Arc<dyn Fn(&Evaluator, &[Value], &Value) -> Result<Value> + Send + Sync>;

/// 操作符注册表
#[derive(Clone, Default)]
pub struct Registry {
    operations: Arc<DashMap<String, Operation>>,
}

impl Registry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            operations: Arc::new(DashMap::new()),
        }
    }

    /// 注册或替换操作符（同名后注册者生效）
    pub fn add(&self, name: impl Into<String>, operation: Operation) {
        let name = name.into();
        tracing::debug!("操作符已注册: {}", name);
        self.operations.insert(name, operation);
    }

    /// 删除操作符（不存在时为空操作）
    pub fn remove(&self, name: &str) {
        if self.operations.remove(name).is_some() {
            tracing::debug!("操作符已删除: {}", name);
        }
    }

    /// 查找操作符
    pub fn get(&self, name: &str) -> Result<Operation> {
        self.operations
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RuleError::OperationNotFound(name.to_string()))
    }

    /// 检查操作符是否存在
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// 当前注册的操作符数量
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// 检查注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// 获取所有操作符名称
    pub fn names(&self) -> Vec<String> {
        self.operations.iter().map(|e| e.key().clone()).collect()
    }
}
