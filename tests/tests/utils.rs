use drover::prelude::*;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();
    ONCE_LOCK.get_or_init(|| {
        FmtSubscriber::builder().with_max_level(Level::DEBUG).init();
    });
}

#[allow(unused)]
pub fn user_schema(save: &[&str]) -> SchemaConfig {
    let mut fields = BTreeMap::new();
    fields.insert("_id".to_string(), FieldSpec::Id);
    fields.insert("name".to_string(), FieldSpec::Word { length: 10 });
    fields.insert("age".to_string(), FieldSpec::Int { min: 18, max: 99 });
    SchemaConfig {
        name: "users".to_string(),
        collection: "users".to_string(),
        fields,
        save: save.iter().map(|s| s.to_string()).collect(),
    }
}
