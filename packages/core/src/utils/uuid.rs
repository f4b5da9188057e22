// Генерация идентификаторов

pub fn generate_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn is_valid(uuid: &str) -> bool {
    uuid::Uuid::parse_str(uuid).is_ok()
}
