//! Encoders and decoders for the permission data values
use crate::config::{AllowedCallsCommand, AllowedKeysCommand, KeyCommand, PermissionsCommand};
use crate::init::parse_hex;
use alloy_primitives::{Address, B256, Bytes};
use anyhow::{Context, Result, anyhow, bail};
use keyguard_engine::{
    allowed_calls::{self, AllowedCall, CallTypes},
    allowed_data_keys,
};
use keyguard_tx::Selector;
use keyguard_types::{
    Permissions,
    data_keys::{self, allowed_calls_key, allowed_data_keys_key, permissions_key},
};

pub fn permissions(command: &PermissionsCommand) -> Result<String> {
    match command {
        PermissionsCommand::Decode { value } => {
            let permissions = Permissions::from_data_value(&parse_hex(value)?);
            let mut lines = vec![permissions.to_string()];
            lines.extend(permissions.names().into_iter().map(str::to_string));
            Ok(lines.join("\n"))
        }
        PermissionsCommand::Encode { names } => {
            let flags = names
                .iter()
                .map(|name| Permissions::from_name(name).ok_or_else(|| anyhow!("unknown permission: {name}")))
                .collect::<Result<Vec<_>>>()?;
            Ok(Permissions::combine(flags).to_string())
        }
    }
}

pub fn allowed_calls(command: &AllowedCallsCommand) -> Result<String> {
    match command {
        AllowedCallsCommand::Decode { value } => {
            let entries = allowed_calls::decode(&parse_hex(value)?)?;
            Ok(entries.iter().map(format_entry).collect::<Vec<_>>().join("\n"))
        }
        AllowedCallsCommand::Encode { entries } => {
            let entries = entries
                .iter()
                .map(|entry| parse_entry(entry))
                .collect::<Result<Vec<_>>>()?;
            if let Some(entry) = entries.iter().find(|entry| entry.is_malformed()) {
                bail!("entry restricts nothing: {}", format_entry(entry));
            }
            Ok(allowed_calls::encode(&entries).to_string())
        }
    }
}

pub fn allowed_keys(command: &AllowedKeysCommand) -> Result<String> {
    match command {
        AllowedKeysCommand::Decode { value } => {
            let prefixes = allowed_data_keys::decode(&parse_hex(value)?)?;
            Ok(prefixes.iter().map(Bytes::to_string).collect::<Vec<_>>().join("\n"))
        }
        AllowedKeysCommand::Encode { prefixes } => {
            let prefixes = prefixes
                .iter()
                .map(|prefix| parse_hex(prefix))
                .collect::<Result<Vec<_>>>()?;
            Ok(allowed_data_keys::encode(&prefixes)?.to_string())
        }
    }
}

pub fn key(command: &KeyCommand) -> Result<String> {
    match command {
        KeyCommand::Classify { key } => {
            let key: B256 = key.trim().parse().with_context(|| format!("invalid data key: {key}"))?;
            Ok(format!("{:?}", data_keys::classify(&key)))
        }
        KeyCommand::Derive { controller } => Ok(derive_keys(*controller)),
    }
}

fn derive_keys(controller: Address) -> String {
    [
        ("Permissions", permissions_key(controller)),
        ("AllowedCalls", allowed_calls_key(controller)),
        ("AllowedERC725YDataKeys", allowed_data_keys_key(controller)),
    ]
    .iter()
    .map(|(name, key)| format!("{name}: {key}"))
    .collect::<Vec<_>>()
    .join("\n")
}

// ============================================================================
// Allowed-Calls entry text form
// ============================================================================

fn format_entry(entry: &AllowedCall) -> String {
    format!(
        "0x{:08x}:0x{}:{}:{}",
        entry.call_types.0,
        hex::encode(entry.address),
        entry.standard,
        entry.function
    )
}

/// `<callTypes>:<address>:<interfaceId>:<selector>`, call types in hex
fn parse_entry(input: &str) -> Result<AllowedCall> {
    let parts: Vec<&str> = input.split(':').collect();
    let [call_types, address, standard, function] = parts.as_slice() else {
        bail!("expected <callTypes>:<address>:<interfaceId>:<selector>, got {input}");
    };

    let call_types = u32::from_str_radix(call_types.trim_start_matches("0x"), 16)
        .with_context(|| format!("invalid call types: {call_types}"))?;
    let address: Address = address.parse().with_context(|| format!("invalid address: {address}"))?;
    let standard: Selector = standard
        .parse()
        .with_context(|| format!("invalid interface id: {standard}"))?;
    let function: Selector = function.parse().with_context(|| format!("invalid selector: {function}"))?;

    Ok(AllowedCall::new(CallTypes(call_types), address, standard, function))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_roundtrip_by_name() {
        let encoded = permissions(&PermissionsCommand::Encode {
            names: vec!["call".to_string(), "SET_DATA".to_string()],
        })
        .unwrap();
        assert_eq!(
            encoded,
            "0x0000000000000000000000000000000000000000000000000000000000040800"
        );

        let decoded = permissions(&PermissionsCommand::Decode { value: encoded }).unwrap();
        assert_eq!(
            decoded.lines().skip(1).collect::<Vec<_>>(),
            vec!["CALL", "SET_DATA"]
        );
    }

    #[test]
    fn test_unknown_permission_name() {
        assert!(
            permissions(&PermissionsCommand::Encode {
                names: vec!["FLY".to_string()],
            })
            .is_err()
        );
    }

    #[test]
    fn test_allowed_calls_text_form() {
        let entry = "0x00000003:0x000000000000000000000000000000000000cafe:0xffffffff:0xa9059cbb";
        let encoded = allowed_calls(&AllowedCallsCommand::Encode {
            entries: vec![entry.to_string()],
        })
        .unwrap();
        assert!(encoded.starts_with("0x0020"));

        let decoded = allowed_calls(&AllowedCallsCommand::Decode { value: encoded }).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_empty_entry_is_refused() {
        let entry = "0x00000002:0x0000000000000000000000000000000000000000:0x00000000:0x00000000";
        assert!(
            allowed_calls(&AllowedCallsCommand::Encode {
                entries: vec![entry.to_string()],
            })
            .is_err()
        );
    }

    #[test]
    fn test_allowed_keys_roundtrip() {
        let encoded = allowed_keys(&AllowedKeysCommand::Encode {
            prefixes: vec!["0xdeba1e29".to_string(), "0x01".to_string()],
        })
        .unwrap();
        assert_eq!(encoded, "0x0004deba1e29000101");

        let decoded = allowed_keys(&AllowedKeysCommand::Decode { value: encoded }).unwrap();
        assert_eq!(decoded, "0xdeba1e29\n0x01");
    }

    #[test]
    fn test_classify_permission_key() {
        let controller = Address::from([0xab; 20]);
        let output = key(&KeyCommand::Classify {
            key: permissions_key(controller).to_string(),
        })
        .unwrap();
        assert_eq!(output, format!("Permissions({controller:?})"));

        let derived = key(&KeyCommand::Derive { controller }).unwrap();
        assert_eq!(derived.lines().count(), 3);
    }
}
