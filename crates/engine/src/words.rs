//! Word lists backing the text and person generators

pub(crate) const LOREM: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in", "reprehenderit",
    "voluptate", "velit", "esse", "cillum", "fugiat", "nulla", "pariatur", "excepteur", "sint",
    "occaecat", "cupidatat", "non", "proident", "sunt", "culpa", "qui", "officia", "deserunt",
    "mollit", "anim", "id", "est", "laborum", "vero", "accusamus", "iusto", "odio", "dignissimos",
    "ducimus", "blanditiis", "praesentium", "voluptatum", "deleniti", "atque", "corrupti", "quos",
    "dolores", "quas", "molestias", "excepturi", "occaecati", "cupiditate", "provident",
];

pub(crate) const FIRST_NAMES: &[&str] = &[
    "Jane", "John", "Amelia", "Oliver", "Isla", "Noah", "Ava", "Liam", "Mia", "Lucas", "Sofia",
    "Mateo", "Freya", "Arjun", "Chloe", "Kenji", "Nadia", "Tomasz", "Leila", "Samuel",
];

pub(crate) const LAST_NAMES: &[&str] = &[
    "Doe", "Smith", "Garcia", "Okafor", "Nguyen", "Kowalski", "Haddad", "Johansson", "Rossi",
    "Murphy", "Tanaka", "Silva", "Fischer", "Dubois", "Patel", "Moreau", "Novak", "Byrne",
];

pub(crate) const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];
