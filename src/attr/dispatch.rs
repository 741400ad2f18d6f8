use crate::attr::{AttrKind, AttrValue};
use crate::core::{DbError, Result, Value};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Equality predicate between two cells of the same kind.
pub type CompareFn = fn(&AttrValue, &AttrValue) -> bool;
/// Human-readable rendering of a cell.
pub type FormatFn = fn(&AttrValue) -> String;
/// Conversion from a cell into the driver's native representation.
pub type EncodeFn = fn(&AttrValue) -> Value;
/// In-place conversion from a driver value into an already-typed cell.
pub type DecodeFn = fn(&mut AttrValue, &Value);

macro_rules! comparators {
    ($map:expr, $($kind:ident),+ $(,)?) => {
        $(
            $map.insert(AttrKind::$kind, (|a, b| match (a, b) {
                (AttrValue::$kind(x), AttrValue::$kind(y)) => x == y,
                _ => false,
            }) as CompareFn);
        )+
    };
}

macro_rules! formatters {
    ($map:expr, $($kind:ident),+ $(,)?) => {
        $(
            $map.insert(AttrKind::$kind, (|value| match value {
                AttrValue::$kind(x) => format!("{x}"),
                _ => String::new(),
            }) as FormatFn);
        )+
    };
}

macro_rules! formatters_opt {
    ($map:expr, $($kind:ident),+ $(,)?) => {
        $(
            $map.insert(AttrKind::$kind, (|value| match value {
                AttrValue::$kind(Some(x)) => format!("{x}"),
                AttrValue::$kind(None) => "{NULL}".to_string(),
                _ => String::new(),
            }) as FormatFn);
        )+
    };
}

macro_rules! encoders {
    ($map:expr, $($kind:ident => |$x:ident| $expr:expr),+ $(,)?) => {
        $(
            $map.insert(AttrKind::$kind, (|value| match value {
                AttrValue::$kind($x) => $expr,
                _ => Value::Null,
            }) as EncodeFn);
        )+
    };
}

macro_rules! encoders_opt {
    ($map:expr, $($kind:ident => |$x:ident| $expr:expr),+ $(,)?) => {
        $(
            $map.insert(AttrKind::$kind, (|value| match value {
                AttrValue::$kind(Some($x)) => $expr,
                _ => Value::Null,
            }) as EncodeFn);
        )+
    };
}

macro_rules! decoders {
    ($map:expr, $($kind:ident => |$src:ident| $expr:expr),+ $(,)?) => {
        $(
            $map.insert(AttrKind::$kind, (|target, $src| {
                if let AttrValue::$kind(slot) = target {
                    *slot = $expr;
                }
            }) as DecodeFn);
        )+
    };
}

/// The four independent runtime-type-dispatch tables.
///
/// Keyed by [`AttrKind`]; populated once (usually before any engine runs)
/// and read-only afterwards. Each table is guarded by a reader-writer lock
/// so late registration may race with lookups. A lookup miss is never fatal
/// here; the caller decides (comparator miss → unequal, formatter miss →
/// placeholder, encoder miss → type mismatch error, decoder miss → cell
/// keeps its default).
pub struct TypeDispatch {
    comparators: RwLock<HashMap<AttrKind, CompareFn>>,
    formatters: RwLock<HashMap<AttrKind, FormatFn>>,
    encoders: RwLock<HashMap<AttrKind, EncodeFn>>,
    decoders: RwLock<HashMap<AttrKind, DecodeFn>>,
}

lazy_static! {
    static ref SHARED_DISPATCH: Arc<TypeDispatch> = Arc::new(TypeDispatch::with_defaults());
}

impl TypeDispatch {
    /// Empty tables; every lookup misses until something is registered.
    pub fn new() -> Self {
        Self {
            comparators: RwLock::new(HashMap::new()),
            formatters: RwLock::new(HashMap::new()),
            encoders: RwLock::new(HashMap::new()),
            decoders: RwLock::new(HashMap::new()),
        }
    }

    /// Tables pre-populated for every builtin attribute kind.
    pub fn with_defaults() -> Self {
        let mut comparators: HashMap<AttrKind, CompareFn> = HashMap::new();
        let mut formatters: HashMap<AttrKind, FormatFn> = HashMap::new();
        let mut encoders: HashMap<AttrKind, EncodeFn> = HashMap::new();
        let mut decoders: HashMap<AttrKind, DecodeFn> = HashMap::new();

        comparators!(
            comparators,
            Bool, Int, UInt, Float, Text, DateTime, Date, Time, Uuid,
            OptBool, OptInt, OptUInt, OptFloat, OptText, OptDateTime, OptDate, OptTime, OptUuid,
        );

        formatters!(formatters, Bool, Int, UInt, Float, Text, DateTime, Date, Time, Uuid);
        formatters_opt!(
            formatters,
            OptBool, OptInt, OptUInt, OptFloat, OptText, OptDateTime, OptDate, OptTime, OptUuid,
        );

        encoders!(
            encoders,
            Bool => |x| Value::Boolean(*x),
            Int => |x| Value::Integer(*x),
            UInt => |x| Value::Unsigned(*x),
            Float => |x| Value::Float(*x),
            Text => |x| Value::Text(x.clone()),
            DateTime => |x| Value::DateTime(*x),
            Date => |x| Value::Date(*x),
            Time => |x| Value::Time(*x),
            Uuid => |x| Value::Text(x.to_string()),
        );
        encoders_opt!(
            encoders,
            OptBool => |x| Value::Boolean(*x),
            OptInt => |x| Value::Integer(*x),
            OptUInt => |x| Value::Unsigned(*x),
            OptFloat => |x| Value::Float(*x),
            OptText => |x| Value::Text(x.clone()),
            OptDateTime => |x| Value::DateTime(*x),
            OptDate => |x| Value::Date(*x),
            OptTime => |x| Value::Time(*x),
            OptUuid => |x| Value::Text(x.to_string()),
        );

        decoders!(
            decoders,
            Bool => |src| src.as_bool(),
            Int => |src| src.as_i64().unwrap_or_default(),
            UInt => |src| src.as_u64().unwrap_or_default(),
            Float => |src| src.as_f64().unwrap_or_default(),
            Text => |src| src.as_text().unwrap_or_default(),
            DateTime => |src| src.as_datetime().unwrap_or_default(),
            Date => |src| src.as_date().unwrap_or_default(),
            Time => |src| src.as_time().unwrap_or_default(),
            Uuid => |src| src
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_default(),
            OptBool => |src| if src.is_null() { None } else { Some(src.as_bool()) },
            OptInt => |src| src.as_i64(),
            OptUInt => |src| src.as_u64(),
            OptFloat => |src| src.as_f64(),
            OptText => |src| src.as_text(),
            OptDateTime => |src| src.as_datetime(),
            OptDate => |src| src.as_date(),
            OptTime => |src| src.as_time(),
            OptUuid => |src| src.as_str().and_then(|s| Uuid::parse_str(s).ok()),
        );

        Self {
            comparators: RwLock::new(comparators),
            formatters: RwLock::new(formatters),
            encoders: RwLock::new(encoders),
            decoders: RwLock::new(decoders),
        }
    }

    /// The process-wide instance with default registrations.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_DISPATCH)
    }

    pub fn register_comparator(&self, kind: AttrKind, f: CompareFn) -> Result<()> {
        self.comparators.write()?.insert(kind, f);
        Ok(())
    }

    pub fn register_formatter(&self, kind: AttrKind, f: FormatFn) -> Result<()> {
        self.formatters.write()?.insert(kind, f);
        Ok(())
    }

    pub fn register_encoder(&self, kind: AttrKind, f: EncodeFn) -> Result<()> {
        self.encoders.write()?.insert(kind, f);
        Ok(())
    }

    pub fn register_decoder(&self, kind: AttrKind, f: DecodeFn) -> Result<()> {
        self.decoders.write()?.insert(kind, f);
        Ok(())
    }

    pub fn comparator(&self, kind: AttrKind) -> Option<CompareFn> {
        self.comparators.read().ok().and_then(|t| t.get(&kind).copied())
    }

    pub fn formatter(&self, kind: AttrKind) -> Option<FormatFn> {
        self.formatters.read().ok().and_then(|t| t.get(&kind).copied())
    }

    pub fn encoder(&self, kind: AttrKind) -> Option<EncodeFn> {
        self.encoders.read().ok().and_then(|t| t.get(&kind).copied())
    }

    pub fn decoder(&self, kind: AttrKind) -> Option<DecodeFn> {
        self.decoders.read().ok().and_then(|t| t.get(&kind).copied())
    }

    /// Compares two cells; `None` when the left kind has no comparator.
    pub fn compare(&self, left: &AttrValue, right: &AttrValue) -> Option<bool> {
        self.comparator(left.kind()).map(|f| f(left, right))
    }

    /// Formats a cell; `None` when its kind has no formatter.
    pub fn format(&self, value: &AttrValue) -> Option<String> {
        self.formatter(value.kind()).map(|f| f(value))
    }

    /// Encodes a cell into a driver value; a missing encoder is an error
    /// because it would silently corrupt a write.
    pub fn encode(&self, value: &AttrValue) -> Result<Value> {
        match self.encoder(value.kind()) {
            Some(f) => Ok(f(value)),
            None => Err(DbError::TypeMismatch(format!(
                "no encoder registered for {}",
                value.kind()
            ))),
        }
    }

    /// Decodes a driver value into the cell in place, selecting the
    /// conversion from the cell's kind. Returns false on a decoder miss;
    /// the cell is left untouched.
    pub fn decode_into(&self, target: &mut AttrValue, source: &Value) -> bool {
        match self.decoder(target.kind()) {
            Some(f) => {
                f(target, source);
                true
            }
            None => false,
        }
    }
}

impl Default for TypeDispatch {
    fn default() -> Self {
        Self::with_defaults()
    }
}
