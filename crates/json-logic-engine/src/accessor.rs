//! 路径访问器
//!
//! 按点号分隔的路径在数据上下文中取值，如 "event.type" 或 "items.0.name"。
//! 缺失（键不存在、索引越界、标量无法下钻）返回 None；路径中途遇到 null
//! 则直接解析为 null——"值为 null" 与 "路径不存在" 是两种不同的结果，
//! var / missing / missing_some 依赖这一区分作为缺失信号。

use serde_json::Value;

/// 解析点号路径
///
/// 空路径返回数据本身。数组段必须能解析为非负整数索引。
pub fn resolve<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(data);
    }

    let mut current = data;

    for segment in path.split('.') {
        // 中途遇到 null 短路：解析成功，结果为 null
        if current.is_null() {
            return Some(current);
        }

        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }

    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_data() -> Value {
        json!({
            "event": {
                "type": "PURCHASE"
            },
            "order": {
                "amount": 1000,
                "items": [
                    {"name": "ticket", "price": 500},
                    {"name": "food", "price": 500}
                ]
            },
            "note": null
        })
    }

    #[test]
    fn test_empty_path_returns_data() {
        let data = sample_data();
        assert_eq!(resolve(&data, ""), Some(&data));
    }

    #[test]
    fn test_nested_object_lookup() {
        let data = sample_data();
        assert_eq!(resolve(&data, "event.type"), Some(&json!("PURCHASE")));
        assert_eq!(resolve(&data, "order.amount"), Some(&json!(1000)));
    }

    #[test]
    fn test_array_index_lookup() {
        let data = sample_data();
        assert_eq!(resolve(&data, "order.items.0.name"), Some(&json!("ticket")));
        assert_eq!(resolve(&data, "order.items.1.price"), Some(&json!(500)));
    }

    #[test]
    fn test_missing_key_is_none() {
        let data = sample_data();
        assert_eq!(resolve(&data, "nonexistent"), None);
        assert_eq!(resolve(&data, "order.discount"), None);
    }

    #[test]
    fn test_out_of_range_index_is_none() {
        let data = sample_data();
        assert_eq!(resolve(&data, "order.items.5"), None);
    }

    #[test]
    fn test_non_numeric_index_is_none() {
        let data = sample_data();
        assert_eq!(resolve(&data, "order.items.first"), None);
    }

    #[test]
    fn test_scalar_cannot_descend() {
        let data = sample_data();
        assert_eq!(resolve(&data, "order.amount.cents"), None);
    }

    #[test]
    fn test_present_null_resolves() {
        // 键存在但值为 null：解析成功，不是缺失
        let data = sample_data();
        assert_eq!(resolve(&data, "note"), Some(&Value::Null));
    }

    #[test]
    fn test_null_short_circuits_mid_path() {
        let data = sample_data();
        assert_eq!(resolve(&data, "note.deeper.path"), Some(&Value::Null));
    }

    #[test]
    fn test_root_index_on_array() {
        let data = json!([10, 20, 30]);
        assert_eq!(resolve(&data, "1"), Some(&json!(20)));
    }
}
