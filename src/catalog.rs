use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{components::Size, error::CatalogError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildingSpec {
    pub size: Size,
    pub workplaces: u64,
    pub accommodation: u64,
    pub water: i64,
    pub waste: i64,
    pub electricity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind {
    Road,
    Building(BuildingSpec),
}

/// Immutable placement definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub description: String,
    pub sprite: String,
    pub cost: i64,
    pub decor: i64,
    pub kind: TemplateKind,
}

impl Template {
    pub fn road(name: impl Into<String>, cost: i64) -> Self {
        let name = name.into();
        Self {
            description: format!("{name} segment"),
            sprite: "sprites/road.png".to_string(),
            name,
            cost,
            decor: 0,
            kind: TemplateKind::Road,
        }
    }

    pub fn building(name: impl Into<String>, cost: i64, spec: BuildingSpec) -> Self {
        let name = name.into();
        Self {
            description: format!("{name} building"),
            sprite: "sprites/building.png".to_string(),
            name,
            cost,
            decor: 0,
            kind: TemplateKind::Building(spec),
        }
    }

    pub fn with_decor(mut self, decor: i64) -> Self {
        self.decor = decor;
        self
    }

    pub fn size(&self) -> Size {
        match &self.kind {
            TemplateKind::Road => Size::UNIT,
            TemplateKind::Building(spec) => spec.size,
        }
    }

    pub fn is_road(&self) -> bool {
        matches!(self.kind, TemplateKind::Road)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |field, reason: &str| CatalogError::InvalidField {
            name: self.name.clone(),
            field,
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name", "must not be blank"));
        }
        if self.description.trim().is_empty() {
            return Err(invalid("description", "must not be blank"));
        }
        if self.sprite.trim().is_empty() {
            return Err(invalid("sprite", "must not be blank"));
        }
        if self.cost <= 0 {
            return Err(invalid("cost", "must be positive"));
        }
        let size = self.size();
        if size.width == 0 || size.height == 0 {
            return Err(invalid("size", "must be at least 1x1"));
        }
        Ok(())
    }
}

/// Ordered, name-unique set of templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    templates: Vec<Template>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_templates(
        templates: impl IntoIterator<Item = Template>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for template in templates {
            catalog.push(template)?;
        }
        Ok(catalog)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(text)?;
        let mut catalog = Self::new();
        for (index, entry) in file.templates.into_iter().enumerate() {
            catalog.push(entry.into_template(index)?)?;
        }
        Ok(catalog)
    }

    pub fn to_yaml_string(&self) -> Result<String, CatalogError> {
        let file = CatalogFile {
            templates: self.templates.iter().map(TemplateEntry::from).collect(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }

    /// Appends a template after validating it.
    pub fn push(&mut self, template: Template) -> Result<(), CatalogError> {
        template.validate()?;
        if self.get(&template.name).is_some() {
            return Err(CatalogError::Duplicate(template.name));
        }
        self.templates.push(template);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

pub struct CatalogLoader {
    base_dir: PathBuf,
}

impl CatalogLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;
        let catalog = Catalog::from_yaml_str(&data)?;
        info!(templates = catalog.len(), path = %path.display(), "loaded template catalog");
        Ok(catalog)
    }

    pub fn save(&self, file: impl AsRef<Path>, catalog: &Catalog) -> Result<(), CatalogError> {
        let path = self.base_dir.join(file);
        let yaml = catalog.to_yaml_string()?;
        fs::write(&path, yaml).map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;
        info!(templates = catalog.len(), path = %path.display(), "wrote template catalog");
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    templates: Vec<TemplateEntry>,
}

/// On-disk shape of a template; every field is optional so missing ones can be named.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sprite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<Size>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workplaces: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accommodation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    water: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    waste: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    electricity: Option<i64>,
}

impl TemplateEntry {
    fn into_template(self, index: usize) -> Result<Template, CatalogError> {
        let missing = |field| CatalogError::MissingField { index, field };
        let kind = self.kind.ok_or_else(|| missing("kind"))?;
        let name = self.name.ok_or_else(|| missing("name"))?;
        let description = self.description.ok_or_else(|| missing("description"))?;
        let sprite = self.sprite.ok_or_else(|| missing("sprite"))?;
        let cost = self.cost.ok_or_else(|| missing("cost"))?;

        let kind = match kind.as_str() {
            "road" => {
                let building_only = [
                    ("size", self.size.is_some()),
                    ("workplaces", self.workplaces.is_some()),
                    ("accommodation", self.accommodation.is_some()),
                    ("water", self.water.is_some()),
                    ("waste", self.waste.is_some()),
                    ("electricity", self.electricity.is_some()),
                ];
                if let Some((field, _)) = building_only.into_iter().find(|(_, set)| *set) {
                    return Err(CatalogError::UnexpectedField { name, field });
                }
                TemplateKind::Road
            }
            "building" => TemplateKind::Building(BuildingSpec {
                size: self.size.unwrap_or_default(),
                workplaces: non_negative(&name, "workplaces", self.workplaces)?,
                accommodation: non_negative(&name, "accommodation", self.accommodation)?,
                water: self.water.unwrap_or(0),
                waste: self.waste.unwrap_or(0),
                electricity: self.electricity.unwrap_or(0),
            }),
            other => {
                return Err(CatalogError::InvalidField {
                    name,
                    field: "kind",
                    reason: format!("expected 'road' or 'building', got '{other}'"),
                })
            }
        };

        Ok(Template {
            name,
            description,
            sprite,
            cost,
            decor: self.decor.unwrap_or(0),
            kind,
        })
    }
}

fn non_negative(name: &str, field: &'static str, value: Option<i64>) -> Result<u64, CatalogError> {
    let value = value.unwrap_or(0);
    u64::try_from(value).map_err(|_| CatalogError::InvalidField {
        name: name.to_string(),
        field,
        reason: format!("must not be negative, got {value}"),
    })
}

impl From<&Template> for TemplateEntry {
    fn from(template: &Template) -> Self {
        let mut entry = TemplateEntry {
            name: Some(template.name.clone()),
            description: Some(template.description.clone()),
            sprite: Some(template.sprite.clone()),
            cost: Some(template.cost),
            decor: (template.decor != 0).then_some(template.decor),
            ..TemplateEntry::default()
        };
        match &template.kind {
            TemplateKind::Road => entry.kind = Some("road".to_string()),
            TemplateKind::Building(spec) => {
                entry.kind = Some("building".to_string());
                entry.size = Some(spec.size);
                entry.workplaces = Some(spec.workplaces as i64);
                entry.accommodation = Some(spec.accommodation as i64);
                entry.water = Some(spec.water);
                entry.waste = Some(spec.waste);
                entry.electricity = Some(spec.electricity);
            }
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
templates:
  - kind: road
    name: Road
    description: Two-lane street
    sprite: sprites/road.png
    cost: 10
  - kind: building
    name: House
    description: Small family home
    sprite: sprites/house.png
    cost: 120
    decor: 5
    size: { width: 2, height: 2 }
    accommodation: 4
    water: -2
    waste: 2
    electricity: -1
"#;

    #[test]
    fn parses_roads_and_buildings_in_order() {
        let catalog = Catalog::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);
        let names: Vec<_> = catalog.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Road", "House"]);

        let road = catalog.get("Road").unwrap();
        assert!(road.is_road());
        assert_eq!(road.decor, 0);

        let house = catalog.get("House").unwrap();
        assert_eq!(house.size(), Size::new(2, 2));
        match &house.kind {
            TemplateKind::Building(spec) => {
                assert_eq!(spec.accommodation, 4);
                assert_eq!(spec.workplaces, 0);
                assert_eq!(spec.water, -2);
            }
            TemplateKind::Road => panic!("house parsed as road"),
        }
    }

    #[test]
    fn missing_required_field_fails_whole_load() {
        let text = r#"
templates:
  - kind: road
    name: Road
    description: Street
    sprite: road.png
    cost: 10
  - kind: building
    name: Shed
    sprite: shed.png
    cost: 10
"#;
        let err = Catalog::from_yaml_str(text).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::MissingField {
                index: 1,
                field: "description"
            }
        ));
    }

    #[test]
    fn non_positive_cost_is_rejected() {
        let text = r#"
templates:
  - kind: road
    name: Free Road
    description: Street
    sprite: road.png
    cost: 0
"#;
        let err = Catalog::from_yaml_str(text).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidField { field: "cost", .. }));
    }

    #[test]
    fn road_with_building_fields_is_malformed() {
        let text = r#"
templates:
  - kind: road
    name: Pipe Road
    description: Street
    sprite: road.png
    cost: 5
    water: 10
"#;
        let err = Catalog::from_yaml_str(text).unwrap_err();
        assert!(matches!(err, CatalogError::UnexpectedField { field: "water", .. }));
    }

    #[test]
    fn negative_accommodation_is_rejected() {
        let text = r#"
templates:
  - kind: building
    name: Void
    description: Nothing
    sprite: void.png
    cost: 5
    accommodation: -3
"#;
        let err = Catalog::from_yaml_str(text).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidField {
                field: "accommodation",
                ..
            }
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Catalog::from_templates([Template::road("Road", 10), Template::road("Road", 12)])
            .unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate(name) if name == "Road"));
    }

    #[test]
    fn push_rejects_blank_description() {
        let mut catalog = Catalog::new();
        let mut template = Template::road("Lane", 4);
        template.description = "   ".into();
        assert!(catalog.push(template).is_err());
        assert!(catalog.is_empty());
    }

    #[test]
    fn yaml_round_trip_keeps_templates() {
        let catalog = Catalog::from_yaml_str(SAMPLE).unwrap();
        let text = catalog.to_yaml_string().unwrap();
        assert_eq!(Catalog::from_yaml_str(&text).unwrap(), catalog);
    }

    #[test]
    fn loader_appends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("placeables.yaml"), SAMPLE).unwrap();
        let loader = CatalogLoader::new(dir.path());
        let mut catalog = loader.load("placeables.yaml").unwrap();
        catalog
            .push(Template::road("Avenue", 25).with_decor(3))
            .unwrap();
        loader.save("placeables.yaml", &catalog).unwrap();

        let reloaded = loader.load("placeables.yaml").unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.get("Avenue").unwrap().decor, 3);
    }

    #[test]
    fn loader_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CatalogLoader::new(dir.path()).load("nope.yaml").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
