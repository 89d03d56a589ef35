//! Argument checking for the `love` API.
//!
//! Every dynamic value crossing into the engine goes through [`Args`], so
//! type and arity errors read the same everywhere:
//! `bad argument #2 to 'translate' (number expected, got string)`.

use mlua::{Lua, Value, Variadic};

use aroma_engine::image::ImageId;

use crate::image::LuaImage;

/// Positional arguments of one API call. Positions are 1-based, as in Lua.
pub struct Args<'l> {
    lua: &'l Lua,
    name: &'static str,
    values: Variadic<Value>,
}

impl<'l> Args<'l> {
    pub fn new(lua: &'l Lua, name: &'static str, values: Variadic<Value>) -> Self {
        Self { lua, name, values }
    }

    /// Number of arguments passed, trailing `nil`s included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Value> {
        pos.checked_sub(1).and_then(|i| self.values.get(i))
    }

    fn is_absent(&self, pos: usize) -> bool {
        matches!(self.get(pos), None | Some(Value::Nil))
    }

    /// Error in the stock Lua format.
    pub fn bad_argument(&self, pos: usize, expected: &str) -> mlua::Error {
        let got = match self.get(pos) {
            None => "no value",
            Some(v) => v.type_name(),
        };
        self.error_at(pos, &format!("{expected} expected, got {got}"))
    }

    pub fn error_at(&self, pos: usize, detail: &str) -> mlua::Error {
        mlua::Error::RuntimeError(format!("bad argument #{pos} to '{}' ({detail})", self.name))
    }

    /// Error attributed to the whole call.
    pub fn error(&self, detail: impl std::fmt::Display) -> mlua::Error {
        mlua::Error::RuntimeError(format!("love.graphics.{}: {detail}", self.name))
    }

    /// A number, or a string Lua would convert to one.
    pub fn number(&self, pos: usize) -> mlua::Result<f64> {
        let Some(value) = self.get(pos) else {
            return Err(self.bad_argument(pos, "number"));
        };
        match value {
            Value::Integer(i) => Ok(*i as f64),
            Value::Number(n) => Ok(*n),
            Value::String(_) => self
                .lua
                .coerce_number(value.clone())?
                .ok_or_else(|| self.bad_argument(pos, "number")),
            _ => Err(self.bad_argument(pos, "number")),
        }
    }

    pub fn opt_number(&self, pos: usize, default: f64) -> mlua::Result<f64> {
        if self.is_absent(pos) {
            Ok(default)
        } else {
            self.number(pos)
        }
    }

    pub fn string(&self, pos: usize) -> mlua::Result<String> {
        match self.get(pos) {
            Some(Value::String(s)) => Ok(s.to_str()?.to_string()),
            Some(Value::Integer(i)) => Ok(i.to_string()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(self.bad_argument(pos, "string")),
        }
    }

    /// Numbers from `pos` to the last argument.
    pub fn numbers_from(&self, pos: usize) -> mlua::Result<Vec<f64>> {
        (pos..=self.len()).map(|p| self.number(p)).collect()
    }

    /// Numbers either spread from `pos` onwards or packed in a sequence
    /// table at `pos`.
    pub fn numbers_or_table(&self, pos: usize) -> mlua::Result<Vec<f64>> {
        let Some(Value::Table(table)) = self.get(pos) else {
            return self.numbers_from(pos);
        };

        let mut out = Vec::with_capacity(table.raw_len());
        for (i, value) in table.clone().sequence_values::<Value>().enumerate() {
            let number = match value? {
                Value::Integer(n) => n as f64,
                Value::Number(n) => n,
                other => {
                    return Err(self.error_at(
                        pos,
                        &format!("table entry {} is a {}, expected number", i + 1, other.type_name()),
                    ));
                }
            };
            out.push(number);
        }
        Ok(out)
    }

    /// The id behind an `Image` userdata.
    pub fn image(&self, pos: usize) -> mlua::Result<ImageId> {
        match self.get(pos) {
            Some(Value::UserData(ud)) => match ud.borrow::<LuaImage>() {
                Ok(image) => Ok(image.id()),
                Err(_) => Err(self.bad_argument(pos, "Image")),
            },
            _ => Err(self.bad_argument(pos, "Image")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(lua: &Lua, values: Vec<Value>) -> Args<'_> {
        Args::new(lua, "translate", Variadic::from_iter(values))
    }

    #[test]
    fn numbers_and_numeric_strings() {
        let lua = Lua::new();
        let a = args(&lua, vec![
            Value::Integer(3),
            Value::Number(2.5),
            Value::String(lua.create_string("10").unwrap()),
        ]);
        assert_eq!(a.number(1).unwrap(), 3.0);
        assert_eq!(a.number(2).unwrap(), 2.5);
        assert_eq!(a.number(3).unwrap(), 10.0);
    }

    #[test]
    fn wrong_type_reads_like_lua() {
        let lua = Lua::new();
        let a = args(&lua, vec![Value::Integer(1), Value::String(lua.create_string("x").unwrap())]);
        let err = a.number(2).unwrap_err().to_string();
        assert!(err.contains("bad argument #2 to 'translate' (number expected, got string)"), "{err}");
    }

    #[test]
    fn missing_argument_is_no_value() {
        let lua = Lua::new();
        let a = args(&lua, vec![Value::Integer(1)]);
        let err = a.number(2).unwrap_err().to_string();
        assert!(err.contains("(number expected, got no value)"), "{err}");
    }

    #[test]
    fn optional_numbers_default_on_nil_or_absent() {
        let lua = Lua::new();
        let a = args(&lua, vec![Value::Nil]);
        assert_eq!(a.opt_number(1, 4.0).unwrap(), 4.0);
        assert_eq!(a.opt_number(2, 5.0).unwrap(), 5.0);
    }

    #[test]
    fn numbers_from_table() {
        let lua = Lua::new();
        let t = lua.create_sequence_from([1.0, 2.0, 3.0]).unwrap();
        let a = args(&lua, vec![Value::String(lua.create_string("fill").unwrap()), Value::Table(t)]);
        assert_eq!(a.numbers_or_table(2).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn image_rejects_other_values() {
        let lua = Lua::new();
        let a = args(&lua, vec![Value::Nil]);
        let err = a.image(1).unwrap_err().to_string();
        assert!(err.contains("(Image expected, got nil)"), "{err}");
    }
}
