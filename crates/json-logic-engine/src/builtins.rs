//! 内置操作符库
//!
//! 实现规则语言的全部内置操作符：算术、比较、逻辑、条件、数组组合子、
//! 字符串操作和路径取值，以及各操作符共用的类型强制转换规则。
//! 所有操作符接收未求值的参数节点，自行决定求值时机，
//! and / or / if 以此实现短路求值。

use crate::accessor;
use crate::error::{Result, RuleError};
use crate::evaluator::Evaluator;
use crate::registry::Registry;
use serde_json::{Map, Value};
use std::sync::Arc;

/// 向注册表注入全部内置操作符
pub(crate) fn register(registry: &Registry) {
    // 相等性：== 与 === 共用同一套宽松相等语义
    registry.add("==", Arc::new(op_eq));
    registry.add("===", Arc::new(op_eq));
    registry.add("!=", Arc::new(op_neq));
    registry.add("!==", Arc::new(op_neq));

    // 真值
    registry.add("!", Arc::new(op_not));
    registry.add("!!", Arc::new(op_double_not));

    // 算术
    registry.add("+", Arc::new(op_add));
    registry.add("-", Arc::new(op_sub));
    registry.add("*", Arc::new(op_mul));
    registry.add("/", Arc::new(op_div));
    registry.add("%", Arc::new(op_rem));
    registry.add("max", Arc::new(op_max));
    registry.add("min", Arc::new(op_min));

    // 链式数值比较
    registry.add("<", Arc::new(op_lt));
    registry.add("<=", Arc::new(op_lte));
    registry.add(">", Arc::new(op_gt));
    registry.add(">=", Arc::new(op_gte));

    // 路径取值与缺失检测
    registry.add("var", Arc::new(op_var));
    registry.add("missing", Arc::new(op_missing));
    registry.add("missing_some", Arc::new(op_missing_some));

    // 逻辑与条件（短路求值）
    registry.add("and", Arc::new(op_and));
    registry.add("or", Arc::new(op_or));
    registry.add("if", Arc::new(op_if));
    registry.add("?:", Arc::new(op_if));

    // 数组组合子
    registry.add("map", Arc::new(op_map));
    registry.add("filter", Arc::new(op_filter));
    registry.add("reduce", Arc::new(op_reduce));
    registry.add("all", Arc::new(op_all));
    registry.add("none", Arc::new(op_none));
    registry.add("some", Arc::new(op_some));
    registry.add("merge", Arc::new(op_merge));
    registry.add("in", Arc::new(op_in));

    // 字符串
    registry.add("cat", Arc::new(op_cat));
    registry.add("substr", Arc::new(op_substr));

    // 诊断
    registry.add("log", Arc::new(op_log));
}

// ---------------------------------------------------------------------------
// 类型强制转换
// ---------------------------------------------------------------------------

/// 获取值的类型名称
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 值的真值判定
///
/// null / false / 0 / 空字符串 / 空数组为假，其余为真（空对象为真）。
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// 将值强制转换为 f64
///
/// null 视为 0，布尔值视为 0 / 1，数值字符串按其解析结果，
/// 空白字符串视为 0；无法转换的值返回 TypeMismatch。
pub fn to_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().ok_or_else(|| RuleError::TypeMismatch {
            expected: "number".to_string(),
            actual: "arbitrary-precision number".to_string(),
        }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(0.0)
            } else {
                trimmed.parse().map_err(|_| RuleError::TypeMismatch {
                    expected: "number".to_string(),
                    actual: format!("string(\"{}\")", s),
                })
            }
        }
        other => Err(RuleError::TypeMismatch {
            expected: "number".to_string(),
            actual: type_name(other).to_string(),
        }),
    }
}

/// 值的字符串形式
///
/// null 视为空字符串，数组为逗号连接的元素字符串形式，对象为紧凑 JSON 文本。
pub fn to_display_string(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(to_display_string).collect::<Result<_>>()?;
            Ok(parts.join(","))
        }
        Value::Object(_) => Ok(serde_json::to_string(value)?),
    }
}

/// 宽松相等
///
/// 数值比较需要统一转为浮点数，避免整数和浮点数比较失败（如 100 == 100.0），
/// 数值字符串和布尔值同样参与数值比较；其余类型按结构相等。
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (as_f64_loose(a), as_f64_loose(b)) {
        return (x - y).abs() < f64::EPSILON;
    }
    a == b
}

fn as_f64_loose(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 将 f64 结果转回 JSON 数值，整数结果写回整数
fn num_value(n: f64) -> Result<Value> {
    if !n.is_finite() {
        return Err(RuleError::NonFiniteNumber(n));
    }
    // 2^53 以内的整值可无损转为 i64
    const SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= SAFE_INTEGER {
        return Ok(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or(RuleError::NonFiniteNumber(n))
}

/// 将求值后的路径参数转为路径字符串（数值路径用于数组索引）
fn path_string(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(RuleError::TypeMismatch {
            expected: "string path".to_string(),
            actual: type_name(other).to_string(),
        }),
    }
}

/// 将求值结果展开为可枚举的元素列表
///
/// 数组展开为元素，null 视为空列表，对象按键序展开为其值；
/// 其余标量不可枚举。
fn enumerate(operator: &str, value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map.values().cloned().collect()),
        other => Err(RuleError::NotEnumerable {
            operator: operator.to_string(),
            actual: type_name(other).to_string(),
        }),
    }
}

fn require_args(operator: &str, min: usize, args: &[Value]) -> Result<()> {
    if args.len() < min {
        return Err(RuleError::InvalidArity {
            operator: operator.to_string(),
            min,
            actual: args.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 相等与真值
// ---------------------------------------------------------------------------

fn op_eq(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("==", 2, args)?;
    let a = evaluator.apply(&args[0], data)?;
    let b = evaluator.apply(&args[1], data)?;
    Ok(Value::Bool(loose_eq(&a, &b)))
}

fn op_neq(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("!=", 2, args)?;
    let a = evaluator.apply(&args[0], data)?;
    let b = evaluator.apply(&args[1], data)?;
    Ok(Value::Bool(!loose_eq(&a, &b)))
}

fn op_not(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("!", 1, args)?;
    let value = evaluator.apply(&args[0], data)?;
    Ok(Value::Bool(!truthy(&value)))
}

fn op_double_not(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("!!", 1, args)?;
    let value = evaluator.apply(&args[0], data)?;
    Ok(Value::Bool(truthy(&value)))
}

// ---------------------------------------------------------------------------
// 算术
// ---------------------------------------------------------------------------

/// 求值全部操作数，单操作数时在左侧补一个 null（如 {"-": 5} 等价于 0 - 5）
fn evaluated_operands(
    evaluator: &Evaluator,
    args: &[Value],
    data: &Value,
) -> Result<Vec<Value>> {
    let mut operands = Vec::with_capacity(args.len().max(2));
    if args.len() == 1 {
        operands.push(Value::Null);
    }
    for arg in args {
        operands.push(evaluator.apply(arg, data)?);
    }
    Ok(operands)
}

fn op_add(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("+", 1, args)?;
    let operands = evaluated_operands(evaluator, args, data)?;

    // 任一操作数为字符串时整条链退化为字符串连接
    if operands.iter().any(Value::is_string) {
        let mut out = String::new();
        for operand in &operands {
            out.push_str(&to_display_string(operand)?);
        }
        return Ok(Value::String(out));
    }

    let mut sum = 0.0;
    for operand in &operands {
        sum += to_f64(operand)?;
    }
    num_value(sum)
}

fn arithmetic(
    operator: &str,
    fold: fn(f64, f64) -> f64,
    evaluator: &Evaluator,
    args: &[Value],
    data: &Value,
) -> Result<Value> {
    require_args(operator, 1, args)?;
    let operands = evaluated_operands(evaluator, args, data)?;

    let mut acc = to_f64(&operands[0])?;
    for operand in &operands[1..] {
        acc = fold(acc, to_f64(operand)?);
    }
    num_value(acc)
}

fn op_sub(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    arithmetic("-", |a, b| a - b, evaluator, args, data)
}

fn op_mul(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    arithmetic("*", |a, b| a * b, evaluator, args, data)
}

fn op_div(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    arithmetic("/", |a, b| a / b, evaluator, args, data)
}

fn op_rem(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    arithmetic("%", |a, b| a % b, evaluator, args, data)
}

/// max / min：从首个操作数起两两保留较大 / 较小值，不做 null 补位
fn extremum(
    operator: &str,
    pick: fn(f64, f64) -> f64,
    evaluator: &Evaluator,
    args: &[Value],
    data: &Value,
) -> Result<Value> {
    require_args(operator, 1, args)?;
    let mut acc = to_f64(&evaluator.apply(&args[0], data)?)?;
    for arg in &args[1..] {
        acc = pick(acc, to_f64(&evaluator.apply(arg, data)?)?);
    }
    num_value(acc)
}

fn op_max(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    extremum("max", f64::max, evaluator, args, data)
}

fn op_min(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    extremum("min", f64::min, evaluator, args, data)
}

// ---------------------------------------------------------------------------
// 链式数值比较
// ---------------------------------------------------------------------------

/// 链式比较：每对相邻操作数都满足比较器才为真（如 1 < 2 < 3）
fn chained_compare(
    operator: &str,
    cmp: fn(f64, f64) -> bool,
    evaluator: &Evaluator,
    args: &[Value],
    data: &Value,
) -> Result<Value> {
    require_args(operator, 2, args)?;
    // 先强制转换全部操作数：链中靠后的转换错误同样要暴露
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        numbers.push(to_f64(&evaluator.apply(arg, data)?)?);
    }
    Ok(Value::Bool(numbers.windows(2).all(|pair| cmp(pair[0], pair[1]))))
}

fn op_lt(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    chained_compare("<", |a, b| a < b, evaluator, args, data)
}

fn op_lte(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    chained_compare("<=", |a, b| a <= b, evaluator, args, data)
}

fn op_gt(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    chained_compare(">", |a, b| a > b, evaluator, args, data)
}

fn op_gte(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    chained_compare(">=", |a, b| a >= b, evaluator, args, data)
}

// ---------------------------------------------------------------------------
// 路径取值与缺失检测
// ---------------------------------------------------------------------------

fn op_var(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    let path_value = match args.first() {
        Some(rule) => evaluator.apply(rule, data)?,
        None => Value::Null,
    };
    // null / 空路径取整个数据上下文
    let path = path_string(&path_value)?;

    match accessor::resolve(data, &path) {
        Some(found) => Ok(found.clone()),
        None => match args.get(1) {
            Some(fallback) => evaluator.apply(fallback, data),
            None => Ok(Value::Null),
        },
    }
}

/// 路径列表中无法解析的子序列（键存在但值为 null 不算缺失）
fn missing_paths(keys: &[Value], data: &Value) -> Result<Vec<Value>> {
    let mut missing = Vec::new();
    for key in keys {
        let path = path_string(key)?;
        if accessor::resolve(data, &path).is_none() {
            missing.push(key.clone());
        }
    }
    Ok(missing)
}

fn op_missing(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    let mut evaluated: Vec<Value> = Vec::with_capacity(args.len());
    for arg in args {
        evaluated.push(evaluator.apply(arg, data)?);
    }

    // 唯一参数求值为数组时，该数组即路径列表（missing_some 依赖此形式）
    let keys: Vec<Value> = if evaluated.len() == 1 && evaluated[0].is_array() {
        match evaluated.swap_remove(0) {
            Value::Array(list) => list,
            _ => Vec::new(),
        }
    } else {
        evaluated
    };

    Ok(Value::Array(missing_paths(&keys, data)?))
}

fn op_missing_some(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("missing_some", 2, args)?;
    let min_required = to_f64(&evaluator.apply(&args[0], data)?)? as usize;
    let keys = match evaluator.apply(&args[1], data)? {
        Value::Array(list) => list,
        other => {
            return Err(RuleError::NotEnumerable {
                operator: "missing_some".to_string(),
                actual: type_name(&other).to_string(),
            });
        }
    };

    let missing = missing_paths(&keys, data)?;
    if keys.len() - missing.len() >= min_required {
        Ok(Value::Array(Vec::new()))
    } else {
        Ok(Value::Array(missing))
    }
}

// ---------------------------------------------------------------------------
// 逻辑与条件
// ---------------------------------------------------------------------------

fn op_and(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("and", 1, args)?;
    let mut last = Value::Null;
    for arg in args {
        last = evaluator.apply(arg, data)?;
        // 短路：返回第一个假值本身
        if !truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}

fn op_or(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("or", 1, args)?;
    let mut last = Value::Null;
    for arg in args {
        last = evaluator.apply(arg, data)?;
        // 短路：返回第一个真值本身
        if truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}

fn op_if(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    let mut i = 0;
    // (条件, 分支) 成对扫描，末尾落单的参数是 else 分支
    while i + 1 < args.len() {
        if truthy(&evaluator.apply(&args[i], data)?) {
            return evaluator.apply(&args[i + 1], data);
        }
        i += 2;
    }
    if i < args.len() {
        return evaluator.apply(&args[i], data);
    }
    Ok(Value::Null)
}

// ---------------------------------------------------------------------------
// 数组组合子
// ---------------------------------------------------------------------------

fn op_map(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("map", 2, args)?;
    let scoped = evaluator.apply(&args[0], data)?;
    let items = enumerate("map", &scoped)?;

    let mut mapped = Vec::with_capacity(items.len());
    for item in &items {
        // 每个元素作为子规则的新数据上下文
        mapped.push(evaluator.apply(&args[1], item)?);
    }
    Ok(Value::Array(mapped))
}

fn op_filter(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("filter", 2, args)?;
    let scoped = evaluator.apply(&args[0], data)?;
    let items = enumerate("filter", &scoped)?;

    let mut kept = Vec::new();
    for item in items {
        if truthy(&evaluator.apply(&args[1], &item)?) {
            kept.push(item);
        }
    }
    Ok(Value::Array(kept))
}

fn op_reduce(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("reduce", 3, args)?;
    let scoped = evaluator.apply(&args[0], data)?;
    let items = enumerate("reduce", &scoped)?;
    let mut accumulator = evaluator.apply(&args[2], data)?;

    for item in items {
        let mut scope = Map::new();
        scope.insert("current".to_string(), item);
        scope.insert("accumulator".to_string(), accumulator);
        accumulator = evaluator.apply(&args[1], &Value::Object(scope))?;
    }
    Ok(accumulator)
}

fn op_all(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("all", 2, args)?;
    let scoped = evaluator.apply(&args[0], data)?;
    let items = enumerate("all", &scoped)?;

    // 空列表上的全称量词为假
    if items.is_empty() {
        return Ok(Value::Bool(false));
    }
    for item in &items {
        if !truthy(&evaluator.apply(&args[1], item)?) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn op_none(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("none", 2, args)?;
    let scoped = evaluator.apply(&args[0], data)?;
    let items = enumerate("none", &scoped)?;

    for item in &items {
        if truthy(&evaluator.apply(&args[1], item)?) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn op_some(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("some", 2, args)?;
    let scoped = evaluator.apply(&args[0], data)?;
    let items = enumerate("some", &scoped)?;

    for item in &items {
        if truthy(&evaluator.apply(&args[1], item)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn op_merge(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    let mut merged = Vec::new();
    for arg in args {
        match evaluator.apply(arg, data)? {
            // 数组结果展平一层，标量追加为单个元素
            Value::Array(items) => merged.extend(items),
            other => merged.push(other),
        }
    }
    Ok(Value::Array(merged))
}

fn op_in(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("in", 2, args)?;
    let needle = evaluator.apply(&args[0], data)?;
    let haystack = evaluator.apply(&args[1], data)?;

    // 字符串做子串检测，其余按可枚举元素做成员检测
    // （null 为空列表，对象按其值），与数组组合子的可枚举规则一致
    if let Value::String(s) = &haystack {
        return Ok(Value::Bool(s.contains(&to_display_string(&needle)?)));
    }
    let items = enumerate("in", &haystack)?;
    Ok(Value::Bool(items.iter().any(|item| loose_eq(item, &needle))))
}

// ---------------------------------------------------------------------------
// 字符串
// ---------------------------------------------------------------------------

fn op_cat(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    let mut out = String::new();
    for arg in args {
        let value = evaluator.apply(arg, data)?;
        out.push_str(&to_display_string(&value)?);
    }
    Ok(Value::String(out))
}

fn op_substr(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("substr", 2, args)?;
    let source = to_display_string(&evaluator.apply(&args[0], data)?)?;
    let start = to_f64(&evaluator.apply(&args[1], data)?)? as i64;
    let length = match args.get(2) {
        Some(rule) => Some(to_f64(&evaluator.apply(rule, data)?)? as i64),
        None => None,
    };

    // 按字符而非字节截取
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len() as i64;

    let begin = if start < 0 {
        (len + start).max(0)
    } else {
        start.min(len)
    };
    let end = match length {
        None => len,
        // 负长度从尾部截掉相应字符数
        Some(l) if l < 0 => (len + l).max(begin),
        Some(l) => (begin + l).min(len),
    };

    Ok(Value::String(
        chars[begin as usize..end as usize].iter().collect(),
    ))
}

// ---------------------------------------------------------------------------
// 诊断
// ---------------------------------------------------------------------------

fn op_log(evaluator: &Evaluator, args: &[Value], data: &Value) -> Result<Value> {
    require_args("log", 1, args)?;
    let value = evaluator.apply(&args[0], data)?;
    tracing::info!("log: {}", value);
    Ok(value)
}
