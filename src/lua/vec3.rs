//! Native 3-component vector exposed to Lua as `vec3`.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use mlua::{MetaMethod, UserData, UserDataFields, UserDataMethods, UserDataRef, Value};

/// A 3-component single precision vector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(&self) -> f32 {
        self.dot(*self).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, scalar: f32) -> Vec3 {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;

    fn div(self, scalar: f32) -> Vec3 {
        Vec3::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vec3({}, {}, {})", self.x, self.y, self.z)
    }
}

impl UserData for Vec3 {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("x", |_, this| Ok(this.x));
        fields.add_field_method_get("y", |_, this| Ok(this.y));
        fields.add_field_method_get("z", |_, this| Ok(this.z));

        fields.add_field_method_set("x", |_, this, value: f32| {
            this.x = value;
            Ok(())
        });
        fields.add_field_method_set("y", |_, this, value: f32| {
            this.y = value;
            Ok(())
        });
        fields.add_field_method_set("z", |_, this, value: f32| {
            this.z = value;
            Ok(())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Add, |_, this, other: UserDataRef<Vec3>| {
            Ok(*this + *other)
        });
        methods.add_meta_method(MetaMethod::Sub, |_, this, other: UserDataRef<Vec3>| {
            Ok(*this - *other)
        });
        // Lua hands `2 * v` and `v * 2` to the same metamethod, operand order preserved.
        methods.add_meta_function(MetaMethod::Mul, |_, (lhs, rhs): (Value, Value)| {
            scale(&lhs, &rhs)
        });
        methods.add_meta_method(MetaMethod::Div, |_, this, scalar: f32| Ok(*this / scalar));
        methods.add_meta_method(MetaMethod::Unm, |_, this, ()| Ok(-*this));
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: UserDataRef<Vec3>| {
            Ok(*this == *other)
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.to_string()));

        methods.add_method("length", |_, this, ()| Ok(this.length()));
        methods.add_method("dot", |_, this, other: UserDataRef<Vec3>| Ok(this.dot(*other)));
    }
}

fn scale(lhs: &Value, rhs: &Value) -> mlua::Result<Vec3> {
    let (vector, scalar) = match (lhs, rhs) {
        (Value::UserData(ud), scalar) | (scalar, Value::UserData(ud)) => (ud, scalar),
        _ => return Err(mlua::Error::runtime("vec3 multiplication needs a vec3 operand")),
    };

    let vector = *vector.borrow::<Vec3>()?;
    let scalar = match scalar {
        Value::Integer(i) => *i as f32,
        Value::Number(n) => *n as f32,
        other => {
            return Err(mlua::Error::runtime(format!(
                "cannot multiply vec3 by {}",
                other.type_name()
            )))
        }
    };

    Ok(vector * scalar)
}
