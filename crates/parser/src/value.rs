//! Dynamic field values and the type descriptors that select their parsers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};

use crate::builtins::DEFAULT_ITEM_SEPARATOR;

/// A decoded field value.
///
/// Values are what parsers produce from token segments and consume when
/// dumping. Composite variants (`List`, `Set`, `Tuple`) nest other values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Absence of a value. Optional fields decode an empty segment to this.
	None,
	/// A boolean.
	Bool(bool),
	/// A signed integer.
	Int(i64),
	/// A floating point number.
	Float(f64),
	/// A string.
	Str(String),
	/// A timestamp with a fixed UTC offset.
	DateTime(DateTime<FixedOffset>),
	/// A calendar date.
	Date(NaiveDate),
	/// A wall-clock time.
	Time(NaiveTime),
	/// A signed duration.
	Duration(TimeDelta),
	/// A fixed offset from UTC.
	Timezone(FixedOffset),
	/// A member of an enumeration.
	Enum(EnumValue),
	/// A combination of flag bits.
	Flags(FlagsValue),
	/// A homogeneous collection.
	List(Vec<Value>),
	/// A homogeneous collection without duplicates, in insertion order.
	Set(Vec<Value>),
	/// A fixed-arity tuple.
	Tuple(Vec<Value>),
	/// A value of a custom leaf type.
	Opaque(Opaque),
}

impl Value {
	/// Short name of the runtime kind, for diagnostics.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Bool(_) => "bool",
			Self::Int(_) => "int",
			Self::Float(_) => "float",
			Self::Str(_) => "str",
			Self::DateTime(_) => "datetime",
			Self::Date(_) => "date",
			Self::Time(_) => "time",
			Self::Duration(_) => "duration",
			Self::Timezone(_) => "timezone",
			Self::Enum(_) => "enum",
			Self::Flags(_) => "flags",
			Self::List(_) => "list",
			Self::Set(_) => "set",
			Self::Tuple(_) => "tuple",
			Self::Opaque(_) => "opaque",
		}
	}

	/// Returns the leaf type this value is an instance of, if it is a leaf.
	pub fn leaf_key(&self) -> Option<TypeKey> {
		match self {
			Self::None => Some(TypeKey::None),
			Self::Bool(_) => Some(TypeKey::Bool),
			Self::Int(_) => Some(TypeKey::Int),
			Self::Float(_) => Some(TypeKey::Float),
			Self::Str(_) => Some(TypeKey::Str),
			Self::DateTime(_) => Some(TypeKey::DateTime),
			Self::Date(_) => Some(TypeKey::Date),
			Self::Time(_) => Some(TypeKey::Time),
			Self::Duration(_) => Some(TypeKey::Duration),
			Self::Timezone(_) => Some(TypeKey::Timezone),
			Self::Opaque(o) => Some(TypeKey::Named(o.type_name.clone())),
			Self::Enum(_) | Self::Flags(_) | Self::List(_) | Self::Set(_) | Self::Tuple(_) => None,
		}
	}

	pub fn is_none(&self) -> bool {
		matches!(self, Self::None)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Self::Float(f) => Some(*f),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Self::List(items) | Self::Set(items) | Self::Tuple(items) => Some(items.as_slice()),
			_ => None,
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Self::Int(value.into())
	}
}

impl From<u32> for Value {
	fn from(value: u32) -> Self {
		Self::Int(value.into())
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::Str(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}

impl From<DateTime<FixedOffset>> for Value {
	fn from(value: DateTime<FixedOffset>) -> Self {
		Self::DateTime(value)
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(value: DateTime<Utc>) -> Self {
		Self::DateTime(value.fixed_offset())
	}
}

impl From<NaiveDate> for Value {
	fn from(value: NaiveDate) -> Self {
		Self::Date(value)
	}
}

impl From<NaiveTime> for Value {
	fn from(value: NaiveTime) -> Self {
		Self::Time(value)
	}
}

impl From<TimeDelta> for Value {
	fn from(value: TimeDelta) -> Self {
		Self::Duration(value)
	}
}

impl From<FixedOffset> for Value {
	fn from(value: FixedOffset) -> Self {
		Self::Timezone(value)
	}
}

impl From<EnumValue> for Value {
	fn from(value: EnumValue) -> Self {
		Self::Enum(value)
	}
}

impl From<FlagsValue> for Value {
	fn from(value: FlagsValue) -> Self {
		Self::Flags(value)
	}
}

impl From<Opaque> for Value {
	fn from(value: Opaque) -> Self {
		Self::Opaque(value)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::None, Into::into)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(value: Vec<T>) -> Self {
		Self::List(value.into_iter().map(Into::into).collect())
	}
}

/// A member of an enumeration, identified by its enum name and member name.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
	/// Name of the enumeration.
	pub ty: Arc<str>,
	/// Name of the member.
	pub name: Arc<str>,
	/// Primitive value the member is stored as.
	pub value: Box<Value>,
}

/// A set of flag bits belonging to a flag enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagsValue {
	/// Name of the flag enumeration.
	pub ty: Arc<str>,
	pub bits: u64,
}

impl FlagsValue {
	/// Returns true if every bit in `other` is set.
	pub fn contains(&self, other: u64) -> bool {
		self.bits & other == other
	}

	/// Returns true if this value belongs to the given flag enumeration.
	pub fn is_of(&self, desc: &EnumDesc) -> bool {
		*self.ty == *desc.name
	}
}

/// Type-erased payload of a custom leaf type.
///
/// Equality is identity: two opaque values are equal when they share the
/// type name and point at the same allocation.
#[derive(Clone)]
pub struct Opaque {
	type_name: Arc<str>,
	data: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
	pub fn new<T: Any + Send + Sync>(type_name: impl Into<Arc<str>>, data: T) -> Self {
		Self {
			type_name: type_name.into(),
			data: Arc::new(data),
		}
	}

	pub fn type_name(&self) -> &str {
		&self.type_name
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.data.downcast_ref()
	}
}

impl fmt::Debug for Opaque {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Opaque").field(&self.type_name).finish()
	}
}

impl PartialEq for Opaque {
	fn eq(&self, other: &Self) -> bool {
		self.type_name == other.type_name && Arc::ptr_eq(&self.data, &other.data)
	}
}

/// Identity of a leaf type in a [`ParserRegistry`](crate::ParserRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
	None,
	Bool,
	Int,
	Float,
	Str,
	DateTime,
	Date,
	Time,
	Duration,
	Timezone,
	/// A custom leaf type, registered by name.
	Named(Arc<str>),
}

impl TypeKey {
	pub fn named(name: impl Into<Arc<str>>) -> Self {
		Self::Named(name.into())
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::None => write!(f, "none"),
			Self::Bool => write!(f, "bool"),
			Self::Int => write!(f, "int"),
			Self::Float => write!(f, "float"),
			Self::Str => write!(f, "str"),
			Self::DateTime => write!(f, "datetime"),
			Self::Date => write!(f, "date"),
			Self::Time => write!(f, "time"),
			Self::Duration => write!(f, "duration"),
			Self::Timezone => write!(f, "timezone"),
			Self::Named(name) => write!(f, "{name}"),
		}
	}
}

/// Whether an enumeration's members are exclusive or combinable bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
	Enum,
	Flag,
}

/// Declaration of an enumeration or flag type.
///
/// Members are stored by primitive value; every member must share one
/// primitive kind, which selects the parser used on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDesc {
	name: Arc<str>,
	kind: EnumKind,
	members: Vec<(Arc<str>, Value)>,
}

impl EnumDesc {
	/// Declares an enumeration whose members are added with [`member`](Self::member).
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self::with_kind(name.into(), EnumKind::Enum)
	}

	/// Declares a flag enumeration. Member values must be integer bit masks.
	pub fn flags(name: impl Into<Arc<str>>) -> Self {
		Self::with_kind(name.into(), EnumKind::Flag)
	}

	fn with_kind(name: Arc<str>, kind: EnumKind) -> Self {
		Self {
			name,
			kind,
			members: Vec::new(),
		}
	}

	pub fn member(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
		self.members.push((name.into(), value.into()));
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn kind(&self) -> EnumKind {
		self.kind
	}

	pub fn members(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.members.iter().map(|(n, v)| (&**n, v))
	}

	/// Infers the primitive type shared by all members.
	///
	/// Returns `None` when the enum is empty, when members disagree, or when a
	/// member value is not a leaf.
	pub fn repr(&self) -> Option<TypeKey> {
		let mut members = self.members.iter();
		let first = members.next()?.1.leaf_key()?;
		members
			.all(|(_, v)| v.leaf_key().as_ref() == Some(&first))
			.then_some(first)
	}

	/// Looks a member up by name.
	pub fn get(&self, name: &str) -> Option<EnumValue> {
		self.members
			.iter()
			.find(|(n, _)| &**n == name)
			.map(|(n, v)| self.make(n, v))
	}

	/// Looks a member up by its primitive value.
	pub fn by_value(&self, value: &Value) -> Option<EnumValue> {
		self.members
			.iter()
			.find(|(_, v)| v == value)
			.map(|(n, v)| self.make(n, v))
	}

	/// Combines the named flag members into one value.
	pub fn flag_set(&self, names: &[&str]) -> Option<FlagsValue> {
		let mut bits = 0u64;
		for name in names {
			let (_, value) = self.members.iter().find(|(n, _)| &**n == *name)?;
			bits |= u64::try_from(value.as_int()?).ok()?;
		}
		Some(self.flags_from_bits(bits))
	}

	/// Union of every member's bits.
	pub fn all_bits(&self) -> u64 {
		self.members
			.iter()
			.filter_map(|(_, v)| v.as_int().and_then(|n| u64::try_from(n).ok()))
			.fold(0, |acc, bits| acc | bits)
	}

	pub(crate) fn flags_from_bits(&self, bits: u64) -> FlagsValue {
		FlagsValue {
			ty: self.name.clone(),
			bits,
		}
	}

	pub(crate) fn owns_member(&self, value: &EnumValue) -> bool {
		*value.ty == *self.name && self.members.iter().any(|(n, _)| *n == value.name)
	}

	fn make(&self, name: &Arc<str>, value: &Value) -> EnumValue {
		EnumValue {
			ty: self.name.clone(),
			name: name.clone(),
			value: Box::new(value.clone()),
		}
	}
}

/// Container produced by a [`TypeDesc::Collection`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionKind {
	#[default]
	List,
	/// Duplicates are dropped on load, keeping the first occurrence.
	Set,
}

/// Declared shape of a field.
///
/// Leaves are looked up in the parser table; every other shape is resolved
/// structurally into a composite parser.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
	Leaf(TypeKey),
	/// Sugar for a union of `T` and none.
	Optional(Box<TypeDesc>),
	/// Members are tried in declared order.
	Union(Vec<TypeDesc>),
	/// A fixed set of allowed values.
	Literal(Vec<Value>),
	Enum(Arc<EnumDesc>),
	/// Homogeneous collection joined by `sep` (default `,`).
	Collection {
		kind: CollectionKind,
		inner: Box<TypeDesc>,
		sep: Option<Arc<str>>,
	},
	/// Fixed-arity tuple joined by `sep` (default `,`).
	Tuple {
		items: Vec<TypeDesc>,
		sep: Option<Arc<str>>,
	},
}

impl TypeDesc {
	pub const NONE: Self = Self::Leaf(TypeKey::None);
	pub const BOOL: Self = Self::Leaf(TypeKey::Bool);
	pub const INT: Self = Self::Leaf(TypeKey::Int);
	pub const FLOAT: Self = Self::Leaf(TypeKey::Float);
	pub const STR: Self = Self::Leaf(TypeKey::Str);
	pub const DATETIME: Self = Self::Leaf(TypeKey::DateTime);
	pub const DATE: Self = Self::Leaf(TypeKey::Date);
	pub const TIME: Self = Self::Leaf(TypeKey::Time);
	pub const DURATION: Self = Self::Leaf(TypeKey::Duration);
	pub const TIMEZONE: Self = Self::Leaf(TypeKey::Timezone);

	pub fn named(name: impl Into<Arc<str>>) -> Self {
		Self::Leaf(TypeKey::named(name))
	}

	pub fn optional(inner: TypeDesc) -> Self {
		Self::Optional(Box::new(inner))
	}

	pub fn union(members: impl IntoIterator<Item = TypeDesc>) -> Self {
		Self::Union(members.into_iter().collect())
	}

	pub fn literal<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
		Self::Literal(values.into_iter().map(Into::into).collect())
	}

	pub fn enumeration(desc: EnumDesc) -> Self {
		Self::Enum(Arc::new(desc))
	}

	pub fn list(inner: TypeDesc) -> Self {
		Self::Collection {
			kind: CollectionKind::List,
			inner: Box::new(inner),
			sep: None,
		}
	}

	pub fn list_sep(inner: TypeDesc, sep: impl Into<Arc<str>>) -> Self {
		Self::Collection {
			kind: CollectionKind::List,
			inner: Box::new(inner),
			sep: Some(sep.into()),
		}
	}

	pub fn set(inner: TypeDesc) -> Self {
		Self::Collection {
			kind: CollectionKind::Set,
			inner: Box::new(inner),
			sep: None,
		}
	}

	pub fn set_sep(inner: TypeDesc, sep: impl Into<Arc<str>>) -> Self {
		Self::Collection {
			kind: CollectionKind::Set,
			inner: Box::new(inner),
			sep: Some(sep.into()),
		}
	}

	pub fn tuple(items: impl IntoIterator<Item = TypeDesc>) -> Self {
		Self::Tuple {
			items: items.into_iter().collect(),
			sep: None,
		}
	}

	pub fn tuple_sep(items: impl IntoIterator<Item = TypeDesc>, sep: impl Into<Arc<str>>) -> Self {
		Self::Tuple {
			items: items.into_iter().collect(),
			sep: Some(sep.into()),
		}
	}

	/// Returns true if an empty segment decodes to [`Value::None`].
	pub fn is_optional(&self) -> bool {
		match self {
			Self::Optional(_) | Self::Leaf(TypeKey::None) => true,
			Self::Union(members) => members.iter().any(Self::is_optional),
			_ => false,
		}
	}

	/// Item separators of every collection and tuple in this shape, with the
	/// default filled in where none was declared.
	pub fn item_separators(&self) -> Vec<&str> {
		let mut out = Vec::new();
		self.collect_separators(&mut out);
		out
	}

	fn collect_separators<'a>(&'a self, out: &mut Vec<&'a str>) {
		match self {
			Self::Collection { inner, sep, .. } => {
				out.push(sep.as_deref().unwrap_or(DEFAULT_ITEM_SEPARATOR));
				inner.collect_separators(out);
			}
			Self::Tuple { items, sep } => {
				out.push(sep.as_deref().unwrap_or(DEFAULT_ITEM_SEPARATOR));
				items.iter().for_each(|item| item.collect_separators(out));
			}
			Self::Optional(inner) => inner.collect_separators(out),
			Self::Union(members) => members.iter().for_each(|m| m.collect_separators(out)),
			Self::Leaf(_) | Self::Literal(_) | Self::Enum(_) => {}
		}
	}

	/// Returns true for shapes that split their input on a separator.
	pub fn is_sequence(&self) -> bool {
		match self {
			Self::Collection { .. } | Self::Tuple { .. } => true,
			Self::Optional(inner) => inner.is_sequence(),
			Self::Union(members) => members.iter().any(Self::is_sequence),
			_ => false,
		}
	}
}

impl From<TypeKey> for TypeDesc {
	fn from(key: TypeKey) -> Self {
		Self::Leaf(key)
	}
}

impl fmt::Display for TypeDesc {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fn join(f: &mut fmt::Formatter<'_>, items: &[TypeDesc]) -> fmt::Result {
			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					write!(f, ", ")?;
				}
				write!(f, "{item}")?;
			}
			Ok(())
		}

		match self {
			Self::Leaf(key) => write!(f, "{key}"),
			Self::Optional(inner) => write!(f, "Optional[{inner}]"),
			Self::Union(members) => {
				write!(f, "Union[")?;
				join(f, members)?;
				write!(f, "]")
			}
			Self::Literal(values) => write!(f, "Literal{values:?}"),
			Self::Enum(desc) => write!(f, "{}", desc.name()),
			Self::Collection { kind, inner, .. } => match kind {
				CollectionKind::List => write!(f, "List[{inner}]"),
				CollectionKind::Set => write!(f, "Set[{inner}]"),
			},
			Self::Tuple { items, .. } => {
				write!(f, "Tuple[")?;
				join(f, items)?;
				write!(f, "]")
			}
		}
	}
}
