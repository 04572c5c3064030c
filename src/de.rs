use serde::de::{Deserialize, Deserializer, Error};
use serde_json::Number;
use std::time::Duration;

/// WeCom reports lists of recipients as a single `|`-separated string, with an
/// empty string or `null` standing in for an empty list.
pub fn pipe_separated<'a, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'a>,
{
    Option::<String>::deserialize(deserializer).map(|s| match s.as_deref() {
        None | Some("") => Vec::new(),
        Some(s) => s.split('|').map(String::from).collect(),
    })
}

#[test]
fn test_pipe_separated() {
    #[derive(Debug, PartialEq, Eq, serde::Deserialize)]
    struct T {
        #[serde(deserialize_with = "pipe_separated")]
        val: Vec<String>,
    }

    assert_eq!(
        serde_json::from_str::<T>(r#"{"val": "alice|bob"}"#).unwrap(),
        T {
            val: vec!["alice".into(), "bob".into()]
        },
    );

    assert_eq!(
        serde_json::from_str::<T>(r#"{"val": ""}"#).unwrap(),
        T { val: Vec::new() },
    );

    assert_eq!(
        serde_json::from_str::<T>(r#"{"val": null}"#).unwrap(),
        T { val: Vec::new() },
    );

    assert!(serde_json::from_str::<T>(r#"{"val": 1}"#).is_err());
}

/// A lifetime in whole seconds. Any integer is accepted; negative values
/// collapse to zero.
pub fn lifetime_seconds<'a, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'a>,
{
    let n = Number::deserialize(deserializer)?;

    match (n.as_u64(), n.as_i64()) {
        (Some(secs), _) => Ok(Duration::from_secs(secs)),
        (None, Some(_)) => Ok(Duration::ZERO),
        _ => Err(Error::custom(format!("invalid lifetime: {}", n))),
    }
}

#[test]
fn test_lifetime_seconds() {
    #[derive(Debug, PartialEq, Eq, serde::Deserialize)]
    struct T {
        #[serde(deserialize_with = "lifetime_seconds")]
        val: Duration,
    }

    assert_eq!(
        serde_json::from_str::<T>(r#"{"val": 7200}"#).unwrap(),
        T {
            val: Duration::from_secs(7200)
        },
    );

    assert_eq!(
        serde_json::from_str::<T>(r#"{"val": -1}"#).unwrap(),
        T {
            val: Duration::ZERO
        },
    );

    assert_eq!(
        serde_json::from_str::<T>(r#"{"val": 18446744073709551615}"#).unwrap(),
        T {
            val: Duration::from_secs(u64::MAX)
        },
    );

    assert!(serde_json::from_str::<T>(r#"{"val": 1.5}"#).is_err());
    assert!(serde_json::from_str::<T>(r#"{"val": "7200"}"#).is_err());
}
