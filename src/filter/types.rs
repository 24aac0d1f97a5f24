//! Filter type descriptors
//!
//! Every descriptor answers three questions about a logical field path:
//! how to compile a filter into a condition fragment, how to project the
//! field in a RETURN expression, and whether an in-memory value passes a
//! filter. The compiled and the in-memory renditions must agree.
//!
//! Recursive types (arrays whose items reference an enclosing type) are
//! resolved lazily through [`LazyType`] on first use.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

use super::bigint::{convert_big_uint, BigUIntWidth};
use super::errors::{FilterError, FilterResult};
use super::ops::{and_conditions, filter_entries, no_conversion, or_conditions, scalar_condition, scalar_test};
use super::params::{combine_path, QueryParams, CURRENT};
use super::selection::FieldSelection;

/// Shared handle to a descriptor
pub type TypeRef = Arc<FilterType>;

/// Reserved filter key for disjunctions
pub const OR_KEY: &str = "OR";

/// Descriptor resolved on first access
pub struct LazyType {
    cell: OnceLock<TypeRef>,
    resolve: Box<dyn Fn() -> TypeRef + Send + Sync>,
}

impl LazyType {
    /// Defers construction until the descriptor is first needed
    pub fn new(resolve: impl Fn() -> TypeRef + Send + Sync + 'static) -> Self {
        Self {
            cell: OnceLock::new(),
            resolve: Box::new(resolve),
        }
    }

    /// Wraps an already constructed descriptor
    pub fn ready(ty: TypeRef) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(ty.clone());
        Self {
            cell,
            resolve: Box::new(move || ty.clone()),
        }
    }

    pub fn get(&self) -> &TypeRef {
        self.cell.get_or_init(|| (self.resolve)())
    }
}

impl fmt::Debug for LazyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(ty) => f.debug_tuple("LazyType").field(ty).finish(),
            None => f.write_str("LazyType(<unresolved>)"),
        }
    }
}

/// Primitive storage kind of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Float,
    String,
    Boolean,
}

impl ScalarKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Float)
    }
}

/// Named sub-fields of a document or nested object
#[derive(Debug)]
pub struct StructType {
    fields: BTreeMap<String, TypeRef>,
    is_collection: bool,
}

/// Quantified filter over the items of an array
#[derive(Debug)]
pub struct ArrayType {
    item: LazyType,
}

/// Name-keyed virtual field over an integer-coded storage field
#[derive(Debug)]
pub struct EnumNameType {
    on_field: String,
    values: BTreeMap<String, i64>,
}

/// Cross-collection reference
#[derive(Debug)]
pub struct JoinType {
    on_field: String,
    ref_on_field: String,
    ref_collection: String,
    ref_type: LazyType,
}

/// Polymorphic filter descriptor
#[derive(Debug)]
pub enum FilterType {
    Scalar(ScalarKind),
    BigUInt(BigUIntWidth),
    Struct(StructType),
    Array(ArrayType),
    EnumName(EnumNameType),
    /// Derived display field; never filterable
    StringCompanion { on_field: String },
    Join(JoinType),
    JoinArray(JoinType),
}

fn storage_name(name: &str) -> &str {
    if name == "id" {
        "_key"
    } else {
        name
    }
}

/// Path of a sibling field (`doc.a.b` + `c` -> `doc.a.c`)
fn sibling_path(path: &str, field: &str) -> String {
    match path.rsplit_once('.') {
        Some((parent, _)) => combine_path(parent, field),
        None => field.to_string(),
    }
}

/// Splits a struct filter on its `OR` key: the filter without `OR`, then
/// recursively the operands of the `OR` branch.
pub fn split_or(filter: &Value) -> Vec<Value> {
    let mut operands = Vec::new();
    let mut current = filter.clone();
    loop {
        let or_operand = match current.as_object_mut() {
            Some(map) => map.remove(OR_KEY),
            None => None,
        };
        operands.push(current);
        match or_operand {
            Some(next) if !next.is_null() => current = next,
            _ => break,
        }
    }
    operands
}

impl StructType {
    pub fn new(fields: impl IntoIterator<Item = (impl Into<String>, TypeRef)>) -> Self {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            is_collection: false,
        }
    }

    /// Root document type of a collection (`id` maps to `_key`)
    pub fn collection(fields: impl IntoIterator<Item = (impl Into<String>, TypeRef)>) -> Self {
        Self {
            is_collection: true,
            ..Self::new(fields)
        }
    }

    pub fn field(&self, name: &str) -> Option<&TypeRef> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, TypeRef> {
        &self.fields
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    fn storage_name<'a>(&self, name: &'a str) -> &'a str {
        if self.is_collection {
            storage_name(name)
        } else {
            name
        }
    }

    fn field_type(&self, name: &str) -> FilterResult<&TypeRef> {
        self.fields
            .get(name)
            .ok_or_else(|| FilterError::invalid_field(name))
    }

    fn fields_condition(
        &self,
        params: &mut QueryParams,
        path: &str,
        filter: &Value,
    ) -> FilterResult<String> {
        let mut conditions = Vec::new();
        for (key, value) in filter_entries(filter)? {
            if key == OR_KEY {
                continue;
            }
            let field_type = self.field_type(key)?;
            let field_path = combine_path(path, self.storage_name(key));
            conditions.push(field_type.filter_condition(params, &field_path, value)?);
        }
        Ok(and_conditions(conditions))
    }

    fn filter_condition(
        &self,
        params: &mut QueryParams,
        path: &str,
        filter: &Value,
    ) -> FilterResult<String> {
        let mut branches = Vec::new();
        for operand in split_or(filter) {
            branches.push(self.fields_condition(params, path, &operand)?);
        }
        Ok(or_conditions(branches))
    }

    fn test_fields(&self, record: &Value, filter: &Value) -> FilterResult<bool> {
        for (key, value) in filter_entries(filter)? {
            if key == OR_KEY {
                continue;
            }
            let field_type = self.field_type(key)?;
            let field_value = record
                .get(self.storage_name(key))
                .unwrap_or(&Value::Null);
            if !field_type.test(record, field_value, value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn test(&self, value: &Value, filter: &Value) -> FilterResult<bool> {
        for operand in split_or(filter) {
            if self.test_fields(value, &operand)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// RETURN expressions for the selected fields, keyed by result name
    pub fn return_expressions(
        &self,
        path: &str,
        selection: &[FieldSelection],
    ) -> FilterResult<Vec<(String, String)>> {
        let mut expressions: Vec<(String, String)> = Vec::new();
        for field in selection {
            if field.name == "__typename" {
                continue;
            }
            let field_type = self.field_type(&field.name).map_err(|_| {
                FilterError::invalid_selection(format!("Invalid field {}", field.name))
            })?;
            let storage = self.storage_name(&field.name);
            let returned = if storage != field.name {
                let renamed = FieldSelection {
                    name: storage.to_string(),
                    selection: field.selection.clone(),
                };
                field_type.return_expression(path, &renamed)?
            } else {
                field_type.return_expression(path, field)?
            };
            match expressions.iter_mut().find(|(name, _)| *name == returned.0) {
                Some(existing) => existing.1 = returned.1,
                None => expressions.push(returned),
            }
        }
        Ok(expressions)
    }

    /// Drops unknown names and adds the storage fields derived fields need
    pub fn prune_selection(&self, selection: &[FieldSelection]) -> Vec<FieldSelection> {
        let mut pruned: Vec<FieldSelection> = Vec::new();
        let mut required: Vec<String> = Vec::new();
        for field in selection {
            let Some(field_type) = self.fields.get(&field.name) else {
                continue;
            };
            if let Some(on_field) = field_type.required_field() {
                required.push(on_field.to_string());
            }
            let children = match field_type.as_ref() {
                FilterType::Struct(inner) => inner.prune_selection(&field.selection),
                FilterType::Array(array) => match array.item().as_ref() {
                    FilterType::Struct(inner) => inner.prune_selection(&field.selection),
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };
            match pruned.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => existing.merge(&children),
                None => pruned.push(FieldSelection {
                    name: field.name.clone(),
                    selection: children,
                }),
            }
        }
        for name in required {
            if self.fields.contains_key(&name) && !pruned.iter().any(|f| f.name == name) {
                pruned.push(FieldSelection::leaf(name));
            }
        }
        pruned
    }

    /// In-memory counterpart of [`StructType::return_expressions`]: the
    /// object a query RETURN would build from `record`. Missing fields are
    /// null, unknown names are skipped.
    pub fn returned_fields(&self, record: &Value, selection: &[FieldSelection]) -> Map<String, Value> {
        let mut returned = Map::new();
        for field in selection {
            let Some(field_type) = self.fields.get(&field.name) else {
                continue;
            };
            let storage = self.storage_name(&field.name);
            let (name, value) = if storage != field.name {
                let renamed = FieldSelection {
                    name: storage.to_string(),
                    selection: field.selection.clone(),
                };
                field_type.returned_value(record, &renamed)
            } else {
                field_type.returned_value(record, field)
            };
            returned.insert(name, value);
        }
        returned
    }
}

fn field_value(record: &Value, name: &str) -> Value {
    record.get(name).cloned().unwrap_or(Value::Null)
}

/// `{ a: expr, b: expr }`
pub fn combine_return_expressions(expressions: &[(String, String)]) -> String {
    let body: Vec<String> = expressions
        .iter()
        .map(|(name, expr)| format!("{}: {}", name, expr))
        .collect();
    format!("{{ {} }}", body.join(", "))
}

impl ArrayType {
    pub fn new(item: TypeRef) -> Self {
        Self {
            item: LazyType::ready(item),
        }
    }

    pub fn lazy(resolve: impl Fn() -> TypeRef + Send + Sync + 'static) -> Self {
        Self {
            item: LazyType::new(resolve),
        }
    }

    pub fn item(&self) -> &TypeRef {
        self.item.get()
    }

    fn quantified_condition(
        &self,
        params: &mut QueryParams,
        path: &str,
        quantifier: &str,
        filter: &Value,
    ) -> FilterResult<String> {
        let item = self.item();
        let param_name = params.next_name();
        params.enter_array(path);
        let item_condition = item.filter_condition(params, CURRENT, filter);
        params.leave_array();
        let item_condition = item_condition?;

        match quantifier {
            "all" => Ok(if item_condition == "true" {
                "true".to_string()
            } else {
                format!(
                    "LENGTH({}[* FILTER {}]) == LENGTH({})",
                    path, item_condition, path
                )
            }),
            _ => {
                if item_condition == "false" {
                    return Ok("false".to_string());
                }
                let suffix = format!(" == @{}", param_name);
                if item_condition == format!("{}{}", CURRENT, suffix) {
                    return Ok(format!("@{} IN {}[*]", param_name, path));
                }
                let sub_path = item_condition
                    .strip_prefix("CURRENT.")
                    .and_then(|rest| rest.strip_suffix(suffix.as_str()))
                    .filter(|sub| {
                        sub.chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
                    });
                if let Some(sub) = sub_path {
                    return Ok(format!("@{} IN {}[*].{}", param_name, path, sub));
                }
                Ok(format!(
                    "LENGTH({}[* FILTER {}]) > 0",
                    path, item_condition
                ))
            }
        }
    }

    fn filter_condition(
        &self,
        params: &mut QueryParams,
        path: &str,
        filter: &Value,
    ) -> FilterResult<String> {
        let mut conditions = Vec::new();
        for (key, value) in filter_entries(filter)? {
            match key.as_str() {
                "any" | "all" => {
                    conditions.push(self.quantified_condition(params, path, key, value)?)
                }
                _ => return Err(FilterError::invalid_field(key)),
            }
        }
        Ok(and_conditions(conditions))
    }

    fn test(&self, parent: &Value, value: &Value, filter: &Value) -> FilterResult<bool> {
        let empty = Vec::new();
        let items = value.as_array().unwrap_or(&empty);
        let item = self.item();
        for (key, item_filter) in filter_entries(filter)? {
            let passed = match key.as_str() {
                "any" => {
                    let mut found = false;
                    for x in items {
                        if item.test(parent, x, item_filter)? {
                            found = true;
                            break;
                        }
                    }
                    found
                }
                "all" => {
                    let mut all = true;
                    for x in items {
                        if !item.test(parent, x, item_filter)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                _ => return Err(FilterError::invalid_field(key)),
            };
            if !passed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn return_expression(&self, path: &str, field: &FieldSelection) -> FilterResult<(String, String)> {
        let field_path = format!("{}.{}", path, field.name);
        if field.selection.is_empty() {
            return Ok((field.name.clone(), field_path));
        }
        let FilterType::Struct(item) = self.item().as_ref() else {
            return Err(FilterError::invalid_selection(format!(
                "Field {} has no sub-fields",
                field.name
            )));
        };
        let alias = field_path.replace('.', "__");
        let item_expressions = item.return_expressions(&alias, &field.selection)?;
        Ok((
            field.name.clone(),
            format!(
                "( {} && ( FOR {} IN {} || [] RETURN {} ) )",
                field_path,
                alias,
                field_path,
                combine_return_expressions(&item_expressions)
            ),
        ))
    }

    fn returned_value(&self, record: &Value, field: &FieldSelection) -> (String, Value) {
        let value = field_value(record, &field.name);
        let FilterType::Struct(item) = self.item().as_ref() else {
            return (field.name.clone(), value);
        };
        match value {
            Value::Array(items) if !field.selection.is_empty() => {
                let projected = items
                    .iter()
                    .map(|entry| Value::Object(item.returned_fields(entry, &field.selection)))
                    .collect();
                (field.name.clone(), Value::Array(projected))
            }
            other => (field.name.clone(), other),
        }
    }
}

impl EnumNameType {
    pub fn new(on_field: impl Into<String>, values: impl IntoIterator<Item = (impl Into<String>, i64)>) -> Self {
        Self {
            on_field: on_field.into(),
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn on_field(&self) -> &str {
        &self.on_field
    }

    /// Backing code for an enum name
    pub fn resolve(&self, name: &Value) -> FilterResult<Value> {
        let key = name.as_str().ok_or_else(|| {
            FilterError::invalid_enum_name(&self.on_field, name.to_string())
        })?;
        self.values
            .get(key)
            .map(|code| Value::from(*code))
            .ok_or_else(|| FilterError::invalid_enum_name(&self.on_field, key))
    }

    /// Enum name for a backing code
    pub fn name_of(&self, code: &Value) -> Option<&str> {
        let code = code.as_i64()?;
        self.values
            .iter()
            .find(|(_, v)| **v == code)
            .map(|(k, _)| k.as_str())
    }
}

impl JoinType {
    pub fn new(
        on_field: impl Into<String>,
        ref_on_field: impl Into<String>,
        ref_collection: impl Into<String>,
        ref_type: impl Fn() -> TypeRef + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_field: on_field.into(),
            ref_on_field: ref_on_field.into(),
            ref_collection: ref_collection.into(),
            ref_type: LazyType::new(ref_type),
        }
    }

    pub fn on_field(&self) -> &str {
        &self.on_field
    }

    pub fn ref_collection(&self) -> &str {
        &self.ref_collection
    }

    pub fn ref_type(&self) -> &TypeRef {
        self.ref_type.get()
    }

    fn join_condition(
        &self,
        params: &mut QueryParams,
        path: &str,
        filter: &Value,
    ) -> FilterResult<String> {
        let on_path = sibling_path(path, storage_name(&self.on_field));
        let alias = on_path.replace('.', "_");
        let ref_condition = self.ref_type().filter_condition(params, &alias, filter)?;
        if ref_condition == "false" {
            return Ok(ref_condition);
        }
        Ok(format!(
            "LENGTH(FOR {a} IN {c} FILTER ({a}.{r} == {on}) AND ({cond}) LIMIT 1 RETURN 1) > 0",
            a = alias,
            c = self.ref_collection,
            r = storage_name(&self.ref_on_field),
            on = on_path,
            cond = ref_condition,
        ))
    }

    /// Array joins resolve each referenced key with `DOCUMENT()`, so the
    /// referenced field must be the target's key (`id` or `_key`).
    fn join_array_condition(
        &self,
        params: &mut QueryParams,
        path: &str,
        filter: &Value,
    ) -> FilterResult<String> {
        if storage_name(&self.ref_on_field) != "_key" {
            return Err(FilterError::invalid_value(
                &self.on_field,
                format!("array join must reference {}.id", self.ref_collection),
            ));
        }
        let on_path = sibling_path(path, storage_name(&self.on_field));
        let alias = on_path.replace('.', "_");
        let mut conditions = Vec::new();
        for (key, ref_filter) in filter_entries(filter)? {
            let all = match key.as_str() {
                "all" => true,
                "any" => false,
                _ => return Err(FilterError::invalid_field(key)),
            };
            let ref_condition = self.ref_type().filter_condition(params, &alias, ref_filter)?;
            let item = format!("{}_{}", alias, key);
            let (limit, expected) = if all {
                (format!("LENGTH({})", on_path), format!("== LENGTH({})", on_path))
            } else {
                ("1".to_string(), "> 0".to_string())
            };
            conditions.push(format!(
                "(LENGTH({on}) > 0) AND (LENGTH(FOR {item} IN {on} LET {a} = DOCUMENT(\"{c}\", {item}) FILTER {cond} LIMIT {limit} RETURN 1) {expected})",
                on = on_path,
                item = item,
                a = alias,
                c = self.ref_collection,
                cond = ref_condition,
                limit = limit,
                expected = expected,
            ));
        }
        Ok(and_conditions(conditions))
    }

    fn test(&self, value: &Value, filter: &Value) -> FilterResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        self.ref_type().test(value, value, filter)
    }

    fn test_array(&self, value: &Value, filter: &Value) -> FilterResult<bool> {
        let empty = Vec::new();
        let docs = value.as_array().unwrap_or(&empty);
        let ref_type = self.ref_type();
        for (key, ref_filter) in filter_entries(filter)? {
            let passed = match key.as_str() {
                "any" => {
                    let mut found = false;
                    for doc in docs {
                        if ref_type.test(doc, doc, ref_filter)? {
                            found = true;
                            break;
                        }
                    }
                    found
                }
                "all" => {
                    let mut all = !docs.is_empty();
                    for doc in docs {
                        if !ref_type.test(doc, doc, ref_filter)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                _ => return Err(FilterError::invalid_field(key)),
            };
            if !passed {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl FilterType {
    pub fn scalar(kind: ScalarKind) -> TypeRef {
        Arc::new(FilterType::Scalar(kind))
    }

    pub fn big_uint(width: BigUIntWidth) -> TypeRef {
        Arc::new(FilterType::BigUInt(width))
    }

    pub fn array(item: TypeRef) -> TypeRef {
        Arc::new(FilterType::Array(ArrayType::new(item)))
    }

    pub fn string_companion(on_field: impl Into<String>) -> TypeRef {
        Arc::new(FilterType::StringCompanion {
            on_field: on_field.into(),
        })
    }

    /// Storage field a derived field reads from, if any
    pub fn required_field(&self) -> Option<&str> {
        match self {
            FilterType::EnumName(e) => Some(e.on_field()),
            FilterType::StringCompanion { on_field } => Some(on_field),
            FilterType::Join(j) | FilterType::JoinArray(j) => Some(j.on_field()),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            FilterType::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Compiles `filter` against the field at `path` into a condition fragment
    pub fn filter_condition(
        &self,
        params: &mut QueryParams,
        path: &str,
        filter: &Value,
    ) -> FilterResult<String> {
        match self {
            FilterType::Scalar(_) => scalar_condition(params, path, filter, &no_conversion),
            FilterType::BigUInt(width) => {
                let width = *width;
                scalar_condition(params, path, filter, &move |v: &Value| {
                    convert_big_uint(width, v)
                })
            }
            FilterType::Struct(s) => s.filter_condition(params, path, filter),
            FilterType::Array(a) => a.filter_condition(params, path, filter),
            FilterType::EnumName(e) => {
                let on_path = sibling_path(path, &e.on_field);
                scalar_condition(params, &on_path, filter, &|v: &Value| e.resolve(v))
            }
            FilterType::StringCompanion { .. } => Ok("false".to_string()),
            FilterType::Join(j) => j.join_condition(params, path, filter),
            FilterType::JoinArray(j) => j.join_array_condition(params, path, filter),
        }
    }

    /// Result name and query expression projecting this field
    pub fn return_expression(
        &self,
        path: &str,
        field: &FieldSelection,
    ) -> FilterResult<(String, String)> {
        match self {
            FilterType::Scalar(_) | FilterType::BigUInt(_) => {
                Ok((field.name.clone(), format!("{}.{}", path, field.name)))
            }
            FilterType::Struct(s) => {
                let field_path = format!("{}.{}", path, field.name);
                if field.selection.is_empty() {
                    return Ok((field.name.clone(), field_path));
                }
                let expressions = s.return_expressions(&field_path, &field.selection)?;
                Ok((
                    field.name.clone(),
                    format!(
                        "( {} && {} )",
                        field_path,
                        combine_return_expressions(&expressions)
                    ),
                ))
            }
            FilterType::Array(a) => a.return_expression(path, field),
            FilterType::EnumName(EnumNameType { on_field, .. })
            | FilterType::StringCompanion { on_field } => {
                Ok((on_field.clone(), format!("{}.{}", path, on_field)))
            }
            FilterType::Join(j) | FilterType::JoinArray(j) => {
                let on = storage_name(&j.on_field);
                Ok((on.to_string(), format!("{}.{}", path, on)))
            }
        }
    }

    /// Result name and value [`FilterType::return_expression`] yields for
    /// `record`
    pub fn returned_value(&self, record: &Value, field: &FieldSelection) -> (String, Value) {
        match self {
            FilterType::Scalar(_) | FilterType::BigUInt(_) => {
                (field.name.clone(), field_value(record, &field.name))
            }
            FilterType::Struct(s) => {
                let value = field_value(record, &field.name);
                if field.selection.is_empty() || !value.is_object() {
                    return (field.name.clone(), value);
                }
                let returned = s.returned_fields(&value, &field.selection);
                (field.name.clone(), Value::Object(returned))
            }
            FilterType::Array(a) => a.returned_value(record, field),
            FilterType::EnumName(EnumNameType { on_field, .. })
            | FilterType::StringCompanion { on_field } => {
                (on_field.clone(), field_value(record, on_field))
            }
            FilterType::Join(j) | FilterType::JoinArray(j) => {
                let on = storage_name(&j.on_field);
                (on.to_string(), field_value(record, on))
            }
        }
    }

    /// Tests an in-memory value (`value`, held by `parent`) against `filter`
    pub fn test(&self, parent: &Value, value: &Value, filter: &Value) -> FilterResult<bool> {
        match self {
            FilterType::Scalar(_) => scalar_test(value, filter, &no_conversion),
            FilterType::BigUInt(width) => {
                let width = *width;
                scalar_test(value, filter, &move |v: &Value| convert_big_uint(width, v))
            }
            FilterType::Struct(s) => s.test(value, filter),
            FilterType::Array(a) => a.test(parent, value, filter),
            FilterType::EnumName(e) => {
                let code = parent.get(&e.on_field).unwrap_or(&Value::Null);
                scalar_test(code, filter, &|v: &Value| e.resolve(v))
            }
            FilterType::StringCompanion { .. } => Ok(false),
            FilterType::Join(j) => j.test(value, filter),
            FilterType::JoinArray(j) => j.test_array(value, filter),
        }
    }

    /// Tests a whole document against a root filter
    pub fn test_document(&self, doc: &Value, filter: &Value) -> FilterResult<bool> {
        self.test(&Value::Null, doc, filter)
    }
}
