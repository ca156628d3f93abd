use super::updater::ReleaseError;
use crate::analysis::ResourceTier;
use serde_json::Value;

/// Fields returned by describe-task-definition that register-task-definition rejects
pub const READ_ONLY_FIELDS: &[&str] = &[
    "taskDefinitionArn",
    "revision",
    "status",
    "requiresAttributes",
    "compatibilities",
    "registeredAt",
    "registeredBy",
    "deregisteredAt",
];

/// Builds the next task definition from the current one.
///
/// Every container definition gets `image`; task-level cpu and memory come
/// from `tier`. Read-only fields are dropped so the result can be registered.
pub fn substitute_image(
    current: &Value,
    image: &str,
    tier: ResourceTier,
) -> Result<Value, ReleaseError> {
    let mut next = current.clone();
    let Some(object) = next.as_object_mut() else {
        return Err(ReleaseError::InvalidDefinition(
            "task definition is not an object".to_string(),
        ));
    };

    for field in READ_ONLY_FIELDS {
        object.remove(*field);
    }

    let containers = object
        .get_mut("containerDefinitions")
        .and_then(Value::as_array_mut)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            ReleaseError::InvalidDefinition("no container definitions".to_string())
        })?;

    for container in containers.iter_mut() {
        let Some(container) = container.as_object_mut() else {
            return Err(ReleaseError::InvalidDefinition(
                "container definition is not an object".to_string(),
            ));
        };
        container.insert("image".to_string(), Value::String(image.to_string()));
    }

    object.insert("cpu".to_string(), Value::String(tier.cpu_units().to_string()));
    object.insert(
        "memory".to_string(),
        Value::String(tier.memory_mib().to_string()),
    );
    Ok(next)
}
