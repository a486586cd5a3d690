//! Index settings and mappings for the three target indices
//!
//! All text fields share one analyzer chain (lowercase + english/russian
//! stemming and stop words) so search behaves the same across entities.
//! Mappings are `dynamic: strict`: a document field the mapping does not
//! know is a bug in the transformer, not something to index silently.

use serde_json::{json, Value};

fn index_settings() -> Value {
    json!({
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": {"type": "stop", "stopwords": "_english_"},
                "english_stemmer": {"type": "stemmer", "language": "english"},
                "english_possessive_stemmer": {"type": "stemmer", "language": "possessive_english"},
                "russian_stop": {"type": "stop", "stopwords": "_russian_"},
                "russian_stemmer": {"type": "stemmer", "language": "russian"}
            },
            "analyzer": {
                "ru_en": {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

fn named_ref_properties() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": {"type": "keyword"},
            "name": {"type": "text", "analyzer": "ru_en"}
        }
    })
}

/// Settings and mappings for the `movies` index.
pub fn films_mapping() -> Value {
    json!({
        "settings": index_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {"type": "keyword"},
                "imdb_rating": {"type": "float"},
                "title": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "description": {"type": "text", "analyzer": "ru_en"},
                "viewing_permission": {"type": "keyword"},
                "genres": named_ref_properties(),
                "actors": named_ref_properties(),
                "directors": named_ref_properties(),
                "writers": named_ref_properties(),
                "actors_names": {"type": "text", "analyzer": "ru_en"},
                "directors_names": {"type": "text", "analyzer": "ru_en"},
                "writers_names": {"type": "text", "analyzer": "ru_en"}
            }
        }
    })
}

/// Settings and mappings for the `genres` index.
pub fn genres_mapping() -> Value {
    json!({
        "settings": index_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {"type": "keyword"},
                "name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "description": {"type": "text", "analyzer": "ru_en"},
                "created": {"type": "date"},
                "modified": {"type": "date"}
            }
        }
    })
}

/// Settings and mappings for the `persons` index.
pub fn persons_mapping() -> Value {
    json!({
        "settings": index_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {"type": "keyword"},
                "full_name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "films": {
                    "type": "nested",
                    "dynamic": "strict",
                    "properties": {
                        "id": {"type": "keyword"},
                        "title": {"type": "text", "analyzer": "ru_en"},
                        "imdb_rating": {"type": "float"},
                        "roles": {"type": "keyword"}
                    }
                }
            }
        }
    })
}
