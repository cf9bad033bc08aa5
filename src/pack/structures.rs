use chrono::{DateTime, Utc};

use super::error::{DecodeError, Result};
use super::serial::{Object, Value};

/// What the installer does when the target file already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideType {
    False,
    True,
    AskFalse,
    AskTrue,
    Update,
    Unknown(String),
}

impl OverrideType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "OVERRIDE_FALSE" => OverrideType::False,
            "OVERRIDE_TRUE" => OverrideType::True,
            "OVERRIDE_ASK_FALSE" => OverrideType::AskFalse,
            "OVERRIDE_ASK_TRUE" => OverrideType::AskTrue,
            "OVERRIDE_UPDATE" => OverrideType::Update,
            other => OverrideType::Unknown(other.to_string()),
        }
    }

    /// Older packs store the policy as an `int` ordinal.
    pub fn from_ordinal(ordinal: i64) -> Self {
        match ordinal {
            0 => OverrideType::False,
            1 => OverrideType::True,
            2 => OverrideType::AskFalse,
            3 => OverrideType::AskTrue,
            4 => OverrideType::Update,
            other => OverrideType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OverrideType::False => "OVERRIDE_FALSE",
            OverrideType::True => "OVERRIDE_TRUE",
            OverrideType::AskFalse => "OVERRIDE_ASK_FALSE",
            OverrideType::AskTrue => "OVERRIDE_ASK_TRUE",
            OverrideType::Update => "OVERRIDE_UPDATE",
            OverrideType::Unknown(name) => name,
        }
    }
}

/// Whether the operating system may lock the file while it is in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blockable {
    None,
    Auto,
    Force,
    Unknown(String),
}

impl Blockable {
    pub fn from_name(name: &str) -> Self {
        match name {
            "BLOCKABLE_NONE" => Blockable::None,
            "BLOCKABLE_AUTO" => Blockable::Auto,
            "BLOCKABLE_FORCE" => Blockable::Force,
            other => Blockable::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Blockable::None => "BLOCKABLE_NONE",
            Blockable::Auto => "BLOCKABLE_AUTO",
            Blockable::Force => "BLOCKABLE_FORCE",
            Blockable::Unknown(name) => name,
        }
    }
}

/// Operating system constraint attached to a packed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsConstraint {
    pub family: Option<String>,
    pub name: Option<String>,
    pub arch: Option<String>,
    pub version: Option<String>,
    pub jre: Option<String>,
}

impl OsConstraint {
    fn from_object(object: &Object) -> Self {
        let text = |name: &str| object.field(name).and_then(Value::as_str).map(str::to_string);
        Self {
            family: text("family"),
            name: text("name"),
            arch: text("arch"),
            version: text("version"),
            jre: text("jre"),
        }
    }
}

/// Header of one packed file.
#[derive(Debug, Clone, PartialEq)]
pub struct PackFile {
    pub relative_path: Option<String>,
    pub target_path: String,
    pub os_constraints: Vec<OsConstraint>,
    /// Size of the file content in bytes.
    pub length: u64,
    /// Modification time in milliseconds since the epoch, `-1` if unknown.
    pub mtime: i64,
    pub is_directory: bool,
    pub override_type: Option<OverrideType>,
    pub override_rename_to: Option<String>,
    pub blockable: Option<Blockable>,
    /// Number of entries in the custom attribute map.
    pub additionals: usize,
    /// Pack holding the content when it was deduplicated into an earlier pack.
    pub previous_pack_id: Option<String>,
    pub offset_in_previous_pack: i64,
    pub pack200_jar: bool,
    pub condition: Option<String>,
}

impl PackFile {
    /// Maps a decoded `PackFile` object.
    ///
    /// Fields missing from the class descriptor keep the class defaults.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| DecodeError::UnexpectedClass {
            expected: "PackFile object",
            found: value.kind().to_string(),
        })?;
        if object.class.simple_name() != "PackFile" {
            return Err(DecodeError::UnexpectedClass {
                expected: "PackFile object",
                found: object.class.name.clone(),
            }
            .into());
        }

        let text = |name: &str| object.field(name).and_then(Value::as_str).map(str::to_string);
        let long = |name: &str| object.field(name).and_then(Value::as_long);
        let flag = |name: &str| object.field(name).and_then(Value::as_bool).unwrap_or(false);

        let target_path = text("targetPath").ok_or(DecodeError::MissingField("targetPath"))?;
        let length = long("length").ok_or(DecodeError::MissingField("length"))?;
        if length < 0 {
            return Err(DecodeError::NegativeLength(length).into());
        }

        let override_type = object.field("override").and_then(|value| match value {
            Value::Enum(constant) => Some(OverrideType::from_name(&constant.name)),
            other => other.as_long().map(OverrideType::from_ordinal),
        });
        let blockable = object
            .field("blockable")
            .and_then(Value::as_enum)
            .map(|constant| Blockable::from_name(&constant.name));

        let os_constraints = object
            .field("osConstraints")
            .and_then(Value::as_object)
            .map(|list| {
                list.annotated_values()
                    .filter_map(Value::as_object)
                    .map(OsConstraint::from_object)
                    .collect()
            })
            .unwrap_or_default();

        // Maps write key and value objects in turn.
        let additionals = object
            .field("additionals")
            .and_then(Value::as_object)
            .map(|map| map.annotated_values().count() / 2)
            .unwrap_or(0);

        Ok(Self {
            relative_path: text("relativePath"),
            target_path,
            os_constraints,
            length: length as u64,
            mtime: long("mtime").unwrap_or(-1),
            is_directory: flag("isDirectory"),
            override_type,
            override_rename_to: text("overrideRenameTo"),
            blockable,
            additionals,
            previous_pack_id: text("previousPackId"),
            offset_in_previous_pack: long("offsetInPreviousPack").unwrap_or(-1),
            pack200_jar: flag("pack200Jar"),
            condition: text("condition"),
        })
    }

    /// True when the content lives in an earlier pack instead of inline.
    pub fn is_back_reference(&self) -> bool {
        self.previous_pack_id.is_some()
    }

    /// Number of payload bytes following this header in the stream.
    pub fn payload_len(&self) -> u64 {
        if self.is_directory || self.is_back_reference() {
            0
        } else {
            self.length
        }
    }

    /// Last modification time in UTC, `None` when unknown.
    pub fn mtime_utc(&self) -> Option<DateTime<Utc>> {
        if self.mtime < 0 {
            return None;
        }
        DateTime::from_timestamp_millis(self.mtime)
    }
}
