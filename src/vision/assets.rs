//! Template assets
//!
//! Loads the bundled screen templates and the owner icons downloaded with
//! the dataset. Layout of the asset directory:
//!
//! ```text
//! <dir>/template/game_header.png
//! <dir>/template/event_chara.png
//! <dir>/template/event_support.png
//! <dir>/template/event_main.png
//! <dir>/icon/<icon file named by the dataset>
//! ```

use std::path::Path;

use image::DynamicImage;

use crate::config::Settings;
use crate::event::EventOwners;

use super::matcher::Template;
use super::owner::OwnerTemplate;
use super::VisionError;

/// Every template the recognition pipeline needs.
#[derive(Debug, Clone)]
pub struct TemplateAssets {
    pub header: Template,
    pub event_chara: Template,
    pub event_support: Template,
    pub event_scenario: Template,
    pub chara_owners: Vec<OwnerTemplate>,
    pub support_owners: Vec<OwnerTemplate>,
}

impl TemplateAssets {
    /// Load all templates from `dir`, resizing owner icons per `settings`.
    pub fn load_from_dir(
        dir: impl AsRef<Path>,
        owners: &EventOwners,
        settings: &Settings,
    ) -> Result<Self, VisionError> {
        let dir = dir.as_ref();
        let template_dir = dir.join("template");
        let icon_dir = dir.join("icon");

        let load_template = |file: &str| -> Result<Template, VisionError> {
            let image = open_image(&template_dir.join(file))?;
            Ok(Template::from_image(file, &image))
        };

        let chara_width = settings.chara_owner.resized_width;
        let chara_owners = owners
            .chara
            .iter()
            .map(|chara| {
                let icons = chara
                    .icon
                    .iter()
                    .map(|file| open_image(&icon_dir.join(file)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(OwnerTemplate::new(chara.to_owner(), &icons, chara_width))
            })
            .collect::<Result<Vec<_>, VisionError>>()?;

        let support_width = settings.support_owner.resized_width;
        let support_owners = owners
            .support
            .iter()
            .map(|support| {
                let icon = open_image(&icon_dir.join(&support.icon))?;
                Ok(OwnerTemplate::new(support.to_owner(), &[icon], support_width))
            })
            .collect::<Result<Vec<_>, VisionError>>()?;

        log::info!(
            "templates loaded from {}: {} chara, {} support owners",
            dir.display(),
            chara_owners.len(),
            support_owners.len()
        );

        Ok(Self {
            header: load_template("game_header.png")?,
            event_chara: load_template("event_chara.png")?,
            event_support: load_template("event_support.png")?,
            event_scenario: load_template("event_main.png")?,
            chara_owners,
            support_owners,
        })
    }
}

fn open_image(path: &Path) -> Result<DynamicImage, VisionError> {
    image::open(path)
        .map_err(|e| VisionError::TemplateLoadError(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CharaOwnerData, SupportOwnerData, SupportType};
    use image::{GrayImage, ImageBuffer, Luma};
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("uma-assets-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("template")).unwrap();
        fs::create_dir_all(dir.join("icon")).unwrap();
        dir
    }

    fn save(path: PathBuf, width: u32, height: u32) {
        let image: GrayImage =
            ImageBuffer::from_fn(width, height, |x, y| Luma([(x * 7 + y * 3) as u8]));
        image.save(path).unwrap();
    }

    fn owners() -> EventOwners {
        EventOwners {
            chara: vec![CharaOwnerData {
                id: 1,
                name: "スペシャルウィーク".to_string(),
                icon: vec!["c1a.png".to_string(), "c1b.png".to_string()],
            }],
            support: vec![SupportOwnerData {
                id: 30,
                name: "ハッピーミーク".to_string(),
                support_type: SupportType::Friend,
                icon: "s30.png".to_string(),
                rarity: None,
            }],
        }
    }

    #[test]
    fn test_load_from_dir() {
        let dir = temp_dir("load");
        for file in [
            "game_header.png",
            "event_chara.png",
            "event_support.png",
            "event_main.png",
        ] {
            save(dir.join("template").join(file), 20, 10);
        }
        for file in ["c1a.png", "c1b.png", "s30.png"] {
            save(dir.join("icon").join(file), 64, 64);
        }

        let settings = Settings::default();
        let assets = TemplateAssets::load_from_dir(&dir, &owners(), &settings).unwrap();

        assert_eq!(assets.header.dimensions(), (20, 10));
        assert_eq!(assets.event_scenario.name(), "event_main.png");
        assert_eq!(assets.chara_owners[0].variants().len(), 2);
        let width = settings.chara_owner.resized_width;
        assert_eq!(assets.chara_owners[0].variants()[0].dimensions(), (width, width));
        assert_eq!(assets.support_owners[0].owner().name(), "ハッピーミーク");

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_icon_is_error() {
        let dir = temp_dir("missing");
        for file in [
            "game_header.png",
            "event_chara.png",
            "event_support.png",
            "event_main.png",
        ] {
            save(dir.join("template").join(file), 20, 10);
        }

        let result = TemplateAssets::load_from_dir(&dir, &owners(), &Settings::default());
        assert!(matches!(
            result,
            Err(VisionError::TemplateLoadError(msg)) if msg.contains("c1a.png")
        ));

        fs::remove_dir_all(dir).unwrap();
    }
}
