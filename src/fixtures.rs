#[cfg(test)]
pub mod test {
    use confique::Config;
    use serde::{Deserialize, Serialize};

    use crate::schema::{Field, Schema};
    use crate::types::FieldType;

    /// `name`, `surname`, `age` in that order; `age` defaults to the string
    /// `"132"` and is cast to an integer at validation.
    pub fn person_schema() -> Schema {
        Schema::declare("person")
            .field(
                Field::new("name")
                    .ty(FieldType::String)
                    .default("Klimenko")
                    .doc("Your first name"),
            )
            .field(
                Field::new("surname")
                    .ty(FieldType::String)
                    .default("Ma")
                    .doc("Surname"),
            )
            .field(
                Field::new("age")
                    .ty(FieldType::Integer)
                    .default("132")
                    .doc("Age is just a number"),
            )
            .version("1.0.0")
            .validate_and_cast()
            .unwrap()
    }

    /// One field of each interesting kind, plus the locator fields.
    pub fn typed_schema() -> Schema {
        Schema::declare("typed")
            .field(Field::new("bar").ty(FieldType::Integer).default(0))
            .field(Field::new("debug").ty(FieldType::Boolean).default(false))
            .field(Field::new("tags").ty(FieldType::List).default("aa"))
            .field(Field::new("url").ty(FieldType::String).default("https://pypi.org"))
            .field(Field::new("token").ty(FieldType::String))
            .field(Field::new("cwd").ty(FieldType::Path).default(""))
            .field(Field::new("cfg").ty(FieldType::Path).default(""))
            .version("1.0.0")
            .validate_and_cast()
            .unwrap()
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct PersonConfig {
        /// Your first name.
        pub name: String,

        /// Surname.
        #[config(default = "Ma")]
        pub surname: String,

        /// Age is just a number.
        #[config(default = 132)]
        pub age: u32,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct NestedConfig {
        #[config(default = 1)]
        pub top: u32,

        #[config(nested)]
        pub inner: PersonConfig,
    }

    #[test]
    fn fixtures_validate() {
        let person = person_schema();
        assert_eq!(person.positional_fields().len(), 3);
        let typed = typed_schema();
        assert!(typed.field("token").unwrap().is_required());
    }
}
