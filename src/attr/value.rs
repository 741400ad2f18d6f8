use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use uuid::Uuid;

/// Runtime type tag of an attribute cell.
///
/// Used as the key of every dispatch table. The set of supported kinds is
/// closed; a nullable counterpart exists for each base kind so that a cell's
/// declared type also fixes its NULL handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Bool,
    Int,
    UInt,
    Float,
    Text,
    DateTime,
    Date,
    Time,
    Uuid,
    OptBool,
    OptInt,
    OptUInt,
    OptFloat,
    OptText,
    OptDateTime,
    OptDate,
    OptTime,
    OptUuid,
}

impl AttrKind {
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Self::OptBool
                | Self::OptInt
                | Self::OptUInt
                | Self::OptFloat
                | Self::OptText
                | Self::OptDateTime
                | Self::OptDate
                | Self::OptTime
                | Self::OptUuid
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "i64",
            Self::UInt => "u64",
            Self::Float => "f64",
            Self::Text => "String",
            Self::DateTime => "NaiveDateTime",
            Self::Date => "NaiveDate",
            Self::Time => "NaiveTime",
            Self::Uuid => "Uuid",
            Self::OptBool => "Option<bool>",
            Self::OptInt => "Option<i64>",
            Self::OptUInt => "Option<u64>",
            Self::OptFloat => "Option<f64>",
            Self::OptText => "Option<String>",
            Self::OptDateTime => "Option<NaiveDateTime>",
            Self::OptDate => "Option<NaiveDate>",
            Self::OptTime => "Option<NaiveTime>",
            Self::OptUuid => "Option<Uuid>",
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Type-erased attribute payload.
///
/// A closed tagged union over the supported attribute kinds; the variant is
/// fixed when the attribute is declared and never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    OptBool(Option<bool>),
    OptInt(Option<i64>),
    OptUInt(Option<u64>),
    OptFloat(Option<f64>),
    OptText(Option<String>),
    OptDateTime(Option<NaiveDateTime>),
    OptDate(Option<NaiveDate>),
    OptTime(Option<NaiveTime>),
    OptUuid(Option<Uuid>),
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::Bool(_) => AttrKind::Bool,
            Self::Int(_) => AttrKind::Int,
            Self::UInt(_) => AttrKind::UInt,
            Self::Float(_) => AttrKind::Float,
            Self::Text(_) => AttrKind::Text,
            Self::DateTime(_) => AttrKind::DateTime,
            Self::Date(_) => AttrKind::Date,
            Self::Time(_) => AttrKind::Time,
            Self::Uuid(_) => AttrKind::Uuid,
            Self::OptBool(_) => AttrKind::OptBool,
            Self::OptInt(_) => AttrKind::OptInt,
            Self::OptUInt(_) => AttrKind::OptUInt,
            Self::OptFloat(_) => AttrKind::OptFloat,
            Self::OptText(_) => AttrKind::OptText,
            Self::OptDateTime(_) => AttrKind::OptDateTime,
            Self::OptDate(_) => AttrKind::OptDate,
            Self::OptTime(_) => AttrKind::OptTime,
            Self::OptUuid(_) => AttrKind::OptUuid,
        }
    }
}

/// Compile-time association between a native Rust type and its attribute
/// kind. Implemented for every supported cell type; this is what makes the
/// typed store accessors (`get::<T>` / `set::<T>`) checkable at runtime.
pub trait AttributeType: Sized + 'static {
    const KIND: AttrKind;

    fn into_attr(self) -> AttrValue;
    fn from_attr(value: &AttrValue) -> Option<&Self>;
}

macro_rules! attribute_type {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl AttributeType for $ty {
                const KIND: AttrKind = AttrKind::$kind;

                fn into_attr(self) -> AttrValue {
                    AttrValue::$kind(self)
                }

                fn from_attr(value: &AttrValue) -> Option<&Self> {
                    match value {
                        AttrValue::$kind(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )+
    };
}

attribute_type! {
    bool => Bool,
    i64 => Int,
    u64 => UInt,
    f64 => Float,
    String => Text,
    NaiveDateTime => DateTime,
    NaiveDate => Date,
    NaiveTime => Time,
    Uuid => Uuid,
    Option<bool> => OptBool,
    Option<i64> => OptInt,
    Option<u64> => OptUInt,
    Option<f64> => OptFloat,
    Option<String> => OptText,
    Option<NaiveDateTime> => OptDateTime,
    Option<NaiveDate> => OptDate,
    Option<NaiveTime> => OptTime,
    Option<Uuid> => OptUuid,
}
