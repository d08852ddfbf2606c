use crate::mot::mot_entities::MotEntity;

/// MOT content type of still images (TS 101 499 slideshows).
const CONTENT_TYPE_IMAGE: u8 = 2;

/// Image formats carried by the slideshow application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideshowImageFormat {
    Gif,
    Jpeg,
    Bmp,
    Png,
    Unknown(u16),
}

impl SlideshowImageFormat {
    fn from_content_subtype(content_subtype: u16) -> Self {
        match content_subtype {
            0 => Self::Gif,
            1 => Self::Jpeg,
            2 => Self::Bmp,
            3 => Self::Png,
            other => Self::Unknown(other),
        }
    }
}

/// A slideshow image extracted from a MOT entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slideshow {
    pub transport_id: u16,
    pub name: String,
    pub image_format: SlideshowImageFormat,
    pub image_data: Vec<u8>,
}

/// Filters MOT entities for slideshow images. Entities of any other content type are
/// left for the generic MOT observers.
pub fn process_mot_entity(entity: &MotEntity) -> Option<Slideshow> {
    if entity.header.content_type != CONTENT_TYPE_IMAGE {
        return None;
    }
    Some(Slideshow {
        transport_id: entity.transport_id,
        name: entity.header.content_name.clone().unwrap_or_default(),
        image_format: SlideshowImageFormat::from_content_subtype(entity.header.content_subtype),
        image_data: entity.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mot::mot_entities::MotHeader;

    fn entity(content_type: u8, content_subtype: u16) -> MotEntity {
        MotEntity {
            transport_id: 7,
            header: MotHeader {
                body_size: 3,
                header_size: 7,
                content_type,
                content_subtype,
                content_name: Some("img".to_string()),
                content_name_charset: 4,
            },
            body: vec![1, 2, 3],
        }
    }

    #[test]
    fn images_become_slideshows() {
        let slideshow = process_mot_entity(&entity(2, 1)).unwrap();
        assert_eq!(slideshow.image_format, SlideshowImageFormat::Jpeg);
        assert_eq!(slideshow.name, "img");
        assert_eq!(slideshow.image_data, vec![1, 2, 3]);
    }

    #[test]
    fn non_images_are_passed_over() {
        assert!(process_mot_entity(&entity(5, 1)).is_none());
    }
}
