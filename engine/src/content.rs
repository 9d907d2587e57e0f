use std::collections::HashMap;

/// Built-in ability catalog JSON.
pub fn builtin_catalog() -> &'static str {
    include_str!("../content/jutsus.json")
}

pub fn builtin_fighters() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("naruto", include_str!("../content/fighters/naruto.json")),
        ("sasuke", include_str!("../content/fighters/sasuke.json")),
        ("hinata", include_str!("../content/fighters/hinata.json")),
        ("shikamaru", include_str!("../content/fighters/shikamaru.json")),
        ("bandit", include_str!("../content/fighters/bandit.json")),
    ])
}
