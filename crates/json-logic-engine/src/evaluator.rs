//! 规则求值器
//!
//! 递归解释规则树：标量即字面量，数组逐元素求值，单键对象是操作调用，
//! 按操作符名称查注册表分发。参数节点不做预求值，由操作符自行控制，
//! 这是 and / or / if 短路求值的前提。
//!
//! 求值为纯同步递归，递归深度等于规则树嵌套深度；极深的规则存在栈
//! 耗尽风险，调用方需对不可信规则限制嵌套层数。

use crate::builtins;
use crate::error::Result;
use crate::registry::{Operation, Registry};
use serde_json::Value;
use std::sync::Arc;

/// 规则求值器
///
/// 构造时向自有注册表填充全部内置操作符；调用方可随后注册、
/// 覆盖或删除操作符。跨线程共享同一实例时，注册表变更对并发中的
/// 求值立即可见，但不提供跨线程的先后顺序保证。
#[derive(Clone)]
pub struct Evaluator {
    registry: Registry,
}

impl Evaluator {
    /// 创建求值器并注入内置操作符
    pub fn new() -> Self {
        let registry = Registry::new();
        builtins::register(&registry);
        Self { registry }
    }

    /// 使用外部注册表创建求值器（不注入内置操作符）
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    /// 获取底层注册表
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// 对数据上下文求值规则树
    ///
    /// - null / 标量 → 自身
    /// - 数组 → 逐元素求值，顺序保留（数组永远不是操作调用）
    /// - 单键对象 → 操作调用：非数组参数包装成单元素参数表
    /// - 零键或多键对象 → 字面量，原样返回
    pub fn apply(&self, rule: &Value, data: &Value) -> Result<Value> {
        match rule {
            Value::Array(items) => {
                let mut evaluated = Vec::with_capacity(items.len());
                for item in items {
                    evaluated.push(self.apply(item, data)?);
                }
                Ok(Value::Array(evaluated))
            }
            Value::Object(map) if map.len() == 1 => {
                // len == 1 已检查，entry 必然存在
                let Some((name, raw_args)) = map.iter().next() else {
                    return Ok(Value::Null);
                };
                let args: Vec<Value> = match raw_args {
                    Value::Array(list) => list.clone(),
                    single => vec![single.clone()],
                };
                let operation = self.registry.get(name)?;
                operation(self, &args, data)
            }
            literal => Ok(literal.clone()),
        }
    }

    /// 注册或覆盖操作符
    pub fn add_operation<F>(&self, name: impl Into<String>, operation: F)
    where
        F: Fn(&Evaluator, &[Value], &Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.registry.add(name, Arc::new(operation));
    }

    /// 删除操作符（不存在时为空操作）
    pub fn remove_operation(&self, name: &str) {
        self.registry.remove(name);
    }

    /// 查找操作符，未注册时返回 OperationNotFound
    pub fn get_operation(&self, name: &str) -> Result<Operation> {
        self.registry.get(name)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
