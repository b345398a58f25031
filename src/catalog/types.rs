//! Catalog data types
//!
//! Wire-format structs mirror the PokeAPI JSON shape; the flattened
//! `PokemonSummary`/`PokemonDetail` models are what the rest of the app sees.

use serde::Deserialize;

/// All known type tags, in canonical display order (used for filter chips)
pub const TYPE_NAMES: [&str; 18] = [
    "normal", "fire", "water", "electric", "grass", "ice", "fighting", "poison", "ground",
    "flying", "psychic", "bug", "rock", "ghost", "dragon", "dark", "steel", "fairy",
];

/// A named API resource reference
#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

/// One page of the pokemon index endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PokemonIndexPage {
    pub results: Vec<NamedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatSlot {
    pub base_stat: u32,
    pub stat: NamedRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedRef,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtworkSprite {
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: ArtworkSprite,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sprites {
    #[serde(default)]
    pub other: OtherSprites,
}

/// Full pokemon record as served by `/pokemon/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct PokemonResource {
    pub id: u32,
    pub name: String,
    /// Height in decimetres
    pub height: u32,
    /// Weight in hectograms
    pub weight: u32,
    pub types: Vec<TypeSlot>,
    pub stats: Vec<StatSlot>,
    pub abilities: Vec<AbilitySlot>,
    #[serde(default)]
    pub sprites: Sprites,
}

/// Species record, used only to resolve alternate-form names to a canonical id
#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesResource {
    pub id: u32,
}

/// Compact catalog entry used by the dex grid and the scanner's known-name list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokemonSummary {
    pub id: u32,
    pub name: String,
    pub types: Vec<String>,
    pub artwork_url: Option<String>,
}

/// One base stat value (0..=255)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatValue {
    pub name: String,
    pub value: u32,
}

/// One ability entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ability {
    pub name: String,
    pub is_hidden: bool,
}

/// Full detail record shown in the detail view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokemonDetail {
    pub id: u32,
    pub name: String,
    /// Height in decimetres
    pub height: u32,
    /// Weight in hectograms
    pub weight: u32,
    pub types: Vec<String>,
    pub stats: Vec<StatValue>,
    pub abilities: Vec<Ability>,
    pub artwork_url: Option<String>,
}

impl PokemonDetail {
    /// Height in metres for display
    pub fn height_m(&self) -> f32 {
        self.height as f32 / 10.0
    }

    /// Weight in kilograms for display
    pub fn weight_kg(&self) -> f32 {
        self.weight as f32 / 10.0
    }

    /// Reduce to the compact summary representation
    pub fn summary(&self) -> PokemonSummary {
        PokemonSummary {
            id: self.id,
            name: self.name.clone(),
            types: self.types.clone(),
            artwork_url: self.artwork_url.clone(),
        }
    }
}

impl From<PokemonResource> for PokemonDetail {
    fn from(resource: PokemonResource) -> Self {
        Self {
            id: resource.id,
            name: resource.name.to_lowercase(),
            height: resource.height,
            weight: resource.weight,
            types: resource.types.into_iter().map(|t| t.kind.name).collect(),
            stats: resource
                .stats
                .into_iter()
                .map(|s| StatValue {
                    name: s.stat.name,
                    value: s.base_stat.min(255),
                })
                .collect(),
            abilities: resource
                .abilities
                .into_iter()
                .map(|a| Ability {
                    name: a.ability.name,
                    is_hidden: a.is_hidden,
                })
                .collect(),
            artwork_url: resource.sprites.other.official_artwork.front_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": 25,
        "name": "pikachu",
        "height": 4,
        "weight": 60,
        "types": [{"slot": 1, "type": {"name": "electric", "url": "https://pokeapi.co/api/v2/type/13/"}}],
        "stats": [
            {"base_stat": 35, "effort": 0, "stat": {"name": "hp", "url": ""}},
            {"base_stat": 90, "effort": 2, "stat": {"name": "speed", "url": ""}}
        ],
        "abilities": [
            {"ability": {"name": "static", "url": ""}, "is_hidden": false, "slot": 1},
            {"ability": {"name": "lightning-rod", "url": ""}, "is_hidden": true, "slot": 3}
        ],
        "sprites": {"other": {"official-artwork": {"front_default": "https://img.example/25.png"}}}
    }"#;

    #[test]
    fn test_deserialize_pokemon_resource() {
        let resource: PokemonResource = serde_json::from_str(SAMPLE).unwrap();

        assert_eq!(resource.id, 25);
        assert_eq!(resource.name, "pikachu");
        assert_eq!(resource.types[0].kind.name, "electric");
        assert_eq!(resource.stats[1].base_stat, 90);
        assert!(resource.abilities[1].is_hidden);
    }

    #[test]
    fn test_detail_conversion() {
        let resource: PokemonResource = serde_json::from_str(SAMPLE).unwrap();
        let detail = PokemonDetail::from(resource);

        assert_eq!(detail.types, vec!["electric".to_string()]);
        assert_eq!(
            detail.stats[0],
            StatValue { name: "hp".to_string(), value: 35 }
        );
        assert_eq!(detail.abilities[0].name, "static");
        assert_eq!(detail.artwork_url.as_deref(), Some("https://img.example/25.png"));
        assert!((detail.height_m() - 0.4).abs() < 1e-6);
        assert!((detail.weight_kg() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_artwork_is_none() {
        let json = r#"{
            "id": 1, "name": "bulbasaur", "height": 7, "weight": 69,
            "types": [], "stats": [], "abilities": [],
            "sprites": {"other": {}}
        }"#;
        let resource: PokemonResource = serde_json::from_str(json).unwrap();
        let detail = PokemonDetail::from(resource);
        assert!(detail.artwork_url.is_none());
    }

    #[test]
    fn test_summary_roundtrip() {
        let resource: PokemonResource = serde_json::from_str(SAMPLE).unwrap();
        let detail = PokemonDetail::from(resource);
        let summary = detail.summary();

        assert_eq!(summary.id, detail.id);
        assert_eq!(summary.name, "pikachu");
        assert_eq!(summary.types, detail.types);
    }
}
