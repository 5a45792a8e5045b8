//! The static catalog bootstrap script (§4.2, §6). `CREATE TABLE IF NOT EXISTS` makes
//! re-running this against a freshly wiped embedded store idempotent.

pub const BOOTSTRAP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "user" (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS database (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    owner_id INTEGER NOT NULL REFERENCES "user"(id),
    default_schema_id INTEGER,
    encoding TEXT NOT NULL DEFAULT 'UTF8',
    collation TEXT,
    connection_limit INTEGER NOT NULL DEFAULT -1
);

CREATE TABLE IF NOT EXISTS schema (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    database_id INTEGER NOT NULL REFERENCES database(id),
    owner_id INTEGER NOT NULL REFERENCES "user"(id),
    type TEXT NOT NULL CHECK (type IN ('RELATIONAL', 'DOCUMENT', 'GRAPH')),
    UNIQUE (database_id, name)
);

CREATE TABLE IF NOT EXISTS "table" (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    schema_id INTEGER NOT NULL REFERENCES schema(id),
    owner_id INTEGER NOT NULL REFERENCES "user"(id),
    type TEXT NOT NULL CHECK (type IN ('TABLE', 'VIEW', 'MATERIALIZED_VIEW', 'STREAM', 'SOURCE')),
    definition TEXT,
    primary_key_id INTEGER,
    UNIQUE (schema_id, name)
);

CREATE TABLE IF NOT EXISTS column_ (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    table_id INTEGER NOT NULL REFERENCES "table"(id),
    position INTEGER NOT NULL,
    type_json TEXT NOT NULL,
    length INTEGER,
    scale INTEGER,
    nullable INTEGER NOT NULL,
    collation TEXT,
    UNIQUE (table_id, name),
    UNIQUE (table_id, position)
);

CREATE TABLE IF NOT EXISTS default_value (
    column_id INTEGER PRIMARY KEY REFERENCES column_(id),
    type_json TEXT NOT NULL,
    literal_text TEXT,
    function_name TEXT
);

CREATE TABLE IF NOT EXISTS store (
    id INTEGER PRIMARY KEY,
    unique_name TEXT NOT NULL UNIQUE,
    adapter TEXT NOT NULL,
    settings_json TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS data_placement (
    store_id INTEGER NOT NULL REFERENCES store(id),
    table_id INTEGER NOT NULL REFERENCES "table"(id),
    placement_type TEXT NOT NULL CHECK (placement_type IN ('AUTOMATIC', 'MANUAL', 'STATIC')),
    PRIMARY KEY (store_id, table_id)
);

CREATE TABLE IF NOT EXISTS column_placement (
    store_id INTEGER NOT NULL REFERENCES store(id),
    column_id INTEGER NOT NULL REFERENCES column_(id),
    physical_schema_name TEXT NOT NULL,
    physical_column_name TEXT NOT NULL,
    placement_type TEXT NOT NULL CHECK (placement_type IN ('AUTOMATIC', 'MANUAL', 'STATIC')),
    PRIMARY KEY (store_id, column_id)
);

CREATE TABLE IF NOT EXISTS key (
    id INTEGER PRIMARY KEY,
    table_id INTEGER NOT NULL REFERENCES "table"(id),
    enforcement_time TEXT NOT NULL CHECK (enforcement_time IN ('ON_QUERY', 'ON_COMMIT'))
);

CREATE TABLE IF NOT EXISTS key_column (
    key_id INTEGER NOT NULL REFERENCES key(id),
    seq INTEGER NOT NULL,
    column_id INTEGER NOT NULL REFERENCES column_(id),
    PRIMARY KEY (key_id, seq)
);

CREATE TABLE IF NOT EXISTS foreign_key (
    key_id INTEGER PRIMARY KEY REFERENCES key(id),
    referenced_key_id INTEGER NOT NULL REFERENCES key(id),
    name TEXT NOT NULL,
    on_update TEXT NOT NULL CHECK (on_update IN ('NO_ACTION', 'CASCADE', 'SET_NULL', 'SET_DEFAULT', 'RESTRICT')),
    on_delete TEXT NOT NULL CHECK (on_delete IN ('NO_ACTION', 'CASCADE', 'SET_NULL', 'SET_DEFAULT', 'RESTRICT'))
);

CREATE TABLE IF NOT EXISTS constraint_ (
    id INTEGER PRIMARY KEY,
    key_id INTEGER NOT NULL REFERENCES key(id),
    type TEXT NOT NULL CHECK (type IN ('UNIQUE', 'PRIMARY')),
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS index_ (
    id INTEGER PRIMARY KEY,
    key_id INTEGER NOT NULL REFERENCES key(id),
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    "unique" INTEGER NOT NULL,
    location INTEGER NOT NULL REFERENCES store(id)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_is_a_sequence_of_create_table_if_not_exists() {
        let statements: Vec<&str> = BOOTSTRAP_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        assert!(!statements.is_empty());
        for stmt in statements {
            assert!(
                stmt.to_uppercase().contains("CREATE TABLE IF NOT EXISTS"),
                "non-idempotent statement: {stmt}"
            );
        }
    }
}
