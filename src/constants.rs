//! Retailer identifiers and the fixed endpoints/vocabulary each crawler starts from.

// Identifiers used on the command line and in config sections
pub const PYATEROCHKA_API: &str = "pyaterochka";
pub const CHIZHIK_API: &str = "chizhik";

// Display names written into the snapshot
pub const PYATEROCHKA_NAME: &str = "Пятёрочка";
pub const CHIZHIK_NAME: &str = "Чижик";

pub const PYATEROCHKA_BASE_URL: &str = "https://5d.5ka.ru/api/catalog/v2";
pub const PYATEROCHKA_STORE_LOOKUP_URL: &str = "https://5d.5ka.ru/api/orders/v1/orders/stores/";
pub const PYATEROCHKA_REFERER: &str = "https://5ka.ru/";
pub const PYATEROCHKA_PRODUCTS_LIMIT: u32 = 499;

// Moscow, Red Square
pub const DEFAULT_LATITUDE: f64 = 55.7539;
pub const DEFAULT_LONGITUDE: f64 = 37.6208;

pub const CHIZHIK_SEARCH_URL: &str = "https://chizhik.club/search";

pub const CHIZHIK_SEARCH_TERMS: &[&str] = &[
    "молоко", "хлеб", "сыр", "масло", "курица", "яйцо", "кофе", "чай", "сахар", "соль",
    "мука", "макароны", "вода", "сок", "колбаса", "сосиски", "овощи", "фрукты", "шоколад",
    "печенье", "йогурт", "творог", "рыба", "мясо", "крупы", "консервы",
];

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

pub const DEFAULT_OUTPUT_PATH: &str = "docs/data.json";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

