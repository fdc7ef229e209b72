use tracing::trace;

use crate::error::{ConversionError, Error, Result};
use crate::expr::Param;
use crate::query::Seed;
use crate::types::{SqlType, ValueKind};
use crate::value::{SqlValue, ToSqlValue};

/// Argument values for one execution of a seed.
///
/// Slots start out holding the values the statement preset itself (literal
/// values, `LIMIT` counts); every other slot is unset until bound. Values are
/// coerced through the slot's descriptor as they are bound, so conversion
/// errors surface here, naming the slot and the SQL.
#[derive(Debug, Clone)]
pub struct Arguments {
    seed: Seed,
    slots: Vec<Option<SqlValue>>,
}

impl Arguments {
    /// Creates the argument set of `seed`.
    #[must_use]
    pub fn new(seed: Seed) -> Self {
        let slots = seed.params().iter().map(|p| p.preset().cloned()).collect();
        Self { seed, slots }
    }

    /// Returns the seed the arguments belong to.
    #[must_use]
    pub const fn seed(&self) -> &Seed {
        &self.seed
    }

    fn store(&mut self, index: usize, value: SqlValue) -> Result<()> {
        self.store_with(index, value, |ty, value| ty.coerce(value))
    }

    /// Stores a value the slot's descriptor has already encoded.
    fn store_encoded(&mut self, index: usize, value: SqlValue) -> Result<()> {
        self.store_with(index, value, |ty, value| ty.accept_encoded(value))
    }

    fn store_with(
        &mut self,
        index: usize,
        value: SqlValue,
        convert: impl FnOnce(&dyn SqlType, SqlValue) -> Result<SqlValue, ConversionError>,
    ) -> Result<()> {
        let Some(spec) = self.seed.params().get(index) else {
            return Err(Error::ParameterIndex {
                index,
                count: self.slots.len(),
                sql: self.seed.sql_arc().clone(),
            });
        };
        let value = convert(spec.ty().as_ref(), value).map_err(|source| Error::Bind {
            index,
            ty: spec.ty().type_name(),
            sql: self.seed.sql_arc().clone(),
            source,
        })?;
        trace!(index, value = ?value, "bound parameter");
        self.slots[index] = Some(value);
        Ok(())
    }

    /// Binds a value at a 0-based position, coercing it through the slot's
    /// descriptor.
    ///
    /// # Errors
    ///
    /// [`Error::ParameterIndex`] for a position outside the statement and
    /// [`Error::Bind`] when the value cannot be coerced.
    pub fn set(&mut self, index: usize, value: impl ToSqlValue) -> Result<&mut Self> {
        self.store(index, value.to_sql_value())?;
        Ok(self)
    }

    /// Binds NULL at a 0-based position.
    ///
    /// # Errors
    ///
    /// As [`Arguments::set`]; NULL is rejected by non-nullable slots.
    pub fn set_null(&mut self, index: usize) -> Result<&mut Self> {
        self.store(index, SqlValue::Null)?;
        Ok(self)
    }

    /// Binds a typed value to every position of `param`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownParameter`] when `param` was not rendered into this
    /// seed and [`Error::Bind`] when the value cannot be stored.
    pub fn bind<K: ValueKind>(
        &mut self,
        param: &Param<K>,
        value: impl Into<Option<K::Value>>,
    ) -> Result<&mut Self> {
        let value = value.into();
        let positions = self.positions(param)?;
        let encoded = param
            .descriptor()
            .bind_value(value.as_ref())
            .map_err(|source| Error::Bind {
                index: positions[0],
                ty: param.descriptor().type_name(),
                sql: self.seed.sql_arc().clone(),
                source,
            })?;
        for index in positions {
            self.store_encoded(index, encoded.clone())?;
        }
        Ok(self)
    }

    /// Binds a plain value to every position of `param`, coercing it through
    /// the placeholder's descriptor.
    ///
    /// # Errors
    ///
    /// As [`Arguments::bind`].
    pub fn bind_value<K: ValueKind>(
        &mut self,
        param: &Param<K>,
        value: impl ToSqlValue,
    ) -> Result<&mut Self> {
        let value = value.to_sql_value();
        for index in self.positions(param)? {
            self.store(index, value.clone())?;
        }
        Ok(self)
    }

    fn positions<K: ValueKind>(&self, param: &Param<K>) -> Result<Vec<usize>> {
        let positions = self.seed.positions(param.id());
        if positions.is_empty() {
            return Err(Error::UnknownParameter {
                sql: self.seed.sql_arc().clone(),
            });
        }
        Ok(positions.to_vec())
    }

    /// Restores preset values and unsets every other slot.
    pub fn reset(&mut self) {
        for (slot, spec) in self.slots.iter_mut().zip(self.seed.params()) {
            *slot = spec.preset().cloned();
        }
    }

    /// Returns whether every slot holds a value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Returns the bound values in placeholder order.
    ///
    /// # Errors
    ///
    /// [`Error::Unbound`] naming the first slot without a value.
    pub fn values(&self) -> Result<Vec<SqlValue>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.clone().ok_or_else(|| Error::Unbound {
                    index,
                    sql: self.seed.sql_arc().clone(),
                })
            })
            .collect()
    }

    /// Returns the bound values, NULL standing in for unset slots.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SqlValue> {
        self.slots
            .iter()
            .map(|slot| slot.clone().unwrap_or(SqlValue::Null))
            .collect()
    }
}
