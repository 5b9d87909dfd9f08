//! 模型回复解析
//!
//! 容忍代码块围栏、前后多余文字、BUY/CALL/SELL/PUT 等方向别名，以及百分数形式的置信度。

use serde_json::Value;
use thiserror::Error;

use sniper_common::Direction;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplyError {
    #[error("no json object in reply")]
    NoJson,
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("missing or invalid field `{0}`")]
    Field(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalystReply {
    pub direction: Direction,
    /// 0.0-1.0，尚未夹取
    pub confidence: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalReply {
    pub approved: bool,
    pub reason: String,
}

/// 取出回复中第一个 `{` 到最后一个 `}` 之间的 JSON 对象
fn extract_object(raw: &str) -> Result<Value, ReplyError> {
    let start = raw.find('{').ok_or(ReplyError::NoJson)?;
    let end = raw.rfind('}').ok_or(ReplyError::NoJson)?;
    if end < start {
        return Err(ReplyError::NoJson);
    }
    let value: Value = serde_json::from_str(&raw[start..=end])
        .map_err(|e| ReplyError::InvalidJson(e.to_string()))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(ReplyError::NoJson)
    }
}

fn parse_confidence(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let normalized = if raw > 1.0 { raw / 100.0 } else { raw };
    if normalized.is_finite() && normalized > 0.0 && normalized <= 1.0 {
        Some(normalized)
    } else {
        None
    }
}

pub fn parse_analyst_reply(raw: &str) -> Result<AnalystReply, ReplyError> {
    let obj = extract_object(raw)?;
    let direction = obj
        .get("direction")
        .or_else(|| obj.get("signal"))
        .and_then(Value::as_str)
        .and_then(Direction::from_label)
        .ok_or(ReplyError::Field("direction"))?;
    let confidence = obj
        .get("confidence")
        .and_then(parse_confidence)
        .ok_or(ReplyError::Field("confidence"))?;
    let explanation = obj
        .get("explanation")
        .or_else(|| obj.get("reason"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    Ok(AnalystReply {
        direction,
        confidence,
        explanation,
    })
}

pub fn parse_approval_reply(raw: &str) -> Result<ApprovalReply, ReplyError> {
    let obj = extract_object(raw)?;
    let approved = match obj.get("approved").or_else(|| obj.get("approve")) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "approved" | "approve" => true,
            "false" | "no" | "rejected" | "reject" => false,
            _ => return Err(ReplyError::Field("approved")),
        },
        _ => return Err(ReplyError::Field("approved")),
    };
    let reason = obj
        .get("reason")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    Ok(ApprovalReply { approved, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let reply = parse_analyst_reply(
            r#"{"direction":"UP","confidence":0.82,"explanation":"RSI oversold bounce."}"#,
        )
        .unwrap();
        assert_eq!(reply.direction, Direction::Up);
        assert_eq!(reply.confidence, 0.82);
        assert_eq!(reply.explanation, "RSI oversold bounce.");
    }

    #[test]
    fn test_code_fence_alias_and_percent() {
        let raw = "Here is my view:\n```json\n{\"direction\": \"put\", \"confidence\": \"78%\", \"explanation\": \"Bearish engulfing\"}\n```";
        let reply = parse_analyst_reply(raw).unwrap();
        assert_eq!(reply.direction, Direction::Down);
        assert!((reply.confidence - 0.78).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_percent() {
        let reply = parse_analyst_reply(r#"{"direction":"BUY","confidence":91}"#).unwrap();
        assert_eq!(reply.direction, Direction::Up);
        assert!((reply.confidence - 0.91).abs() < 1e-9);
        assert!(reply.explanation.is_empty());
    }

    #[test]
    fn test_malformed_replies() {
        assert_eq!(parse_analyst_reply("I think it goes up"), Err(ReplyError::NoJson));
        assert_eq!(
            parse_analyst_reply(r#"{"direction":"SIDEWAYS","confidence":0.7}"#),
            Err(ReplyError::Field("direction"))
        );
        assert_eq!(
            parse_analyst_reply(r#"{"direction":"UP","confidence":"high"}"#),
            Err(ReplyError::Field("confidence"))
        );
        assert!(matches!(
            parse_analyst_reply("{direction: UP}"),
            Err(ReplyError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_approval_reply() {
        let yes = parse_approval_reply(r#"{"approved": true, "reason": "clean setup"}"#).unwrap();
        assert!(yes.approved);
        let no = parse_approval_reply(r#"```{"approved": "no", "reason": "choppy"}```"#).unwrap();
        assert!(!no.approved);
        assert_eq!(no.reason, "choppy");
        assert!(parse_approval_reply(r#"{"reason": "?"}"#).is_err());
    }
}
