use serde::{Deserialize, Serialize};

/// A row of the `World` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub id: i32,
    #[serde(rename = "randomNumber")]
    pub random_number: i32,
}

/// A row of the `Fortune` table, or the synthetic record added per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fortune {
    pub id: i32,
    pub message: String,
}

impl Fortune {
    pub fn new(id: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_wire_names() {
        let world = World {
            id: 17,
            random_number: 4242,
        };
        let json = serde_json::to_value(world).unwrap();
        assert_eq!(json, serde_json::json!({"id": 17, "randomNumber": 4242}));
    }

    #[test]
    fn test_fortune_wire_names() {
        let json = serde_json::to_value(Fortune::new(3, "hello")).unwrap();
        assert_eq!(json, serde_json::json!({"id": 3, "message": "hello"}));
    }
}
