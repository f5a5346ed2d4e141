use diesel::prelude::*;

use crate::schema::kv_entries;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = kv_entries)]
pub struct KvEntryRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = kv_entries)]
pub struct NewKvEntryRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
