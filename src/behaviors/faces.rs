use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rolls a mesh (typically a die) onto one of its faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomizeBehavior {
    pub face: u8,
    pub max: u8,
}

impl Default for RandomizeBehavior {
    fn default() -> Self {
        Self { face: 1, max: 6 }
    }
}

impl RandomizeBehavior {
    /// Number of faces; a mesh always has at least one.
    pub fn faces(&self) -> u8 {
        self.max.max(1)
    }

    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u8 {
        self.face = rng.random_range(1..=self.faces());
        self.face
    }

    /// Shows `face` when it exists on this mesh.
    pub fn set_face(&mut self, face: u8) -> bool {
        if face == 0 || face > self.faces() {
            return false;
        }
        self.face = face;
        true
    }
}

/// Images shown when a player asks for a closer look at a mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailBehavior {
    pub front: String,
    pub back: Option<String>,
}

impl DetailBehavior {
    pub fn visible_face(&self, is_flipped: bool) -> &str {
        match (&self.back, is_flipped) {
            (Some(back), true) => back,
            _ => &self.front,
        }
    }
}

/// Enlarged view of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub mesh_id: String,
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn randomize_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut die = RandomizeBehavior::default();
        for _ in 0..100 {
            let face = die.randomize(&mut rng);
            assert!((1..=6).contains(&face));
        }
    }

    #[test]
    fn set_face_rejects_missing_faces() {
        let mut die = RandomizeBehavior { face: 1, max: 4 };
        assert!(!die.set_face(5));
        assert!(!die.set_face(0));
        assert!(die.set_face(4));
        assert_eq!(die.face, 4);
    }

    #[test]
    fn faceless_mesh_accepts_its_own_roll() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut roller = RandomizeBehavior { face: 1, max: 0 };
        let face = roller.randomize(&mut rng);
        assert_eq!(face, 1);
        assert!(roller.set_face(face));
        assert!(!roller.set_face(2));
    }

    #[test]
    fn back_is_shown_only_when_flipped() {
        let detail = DetailBehavior {
            front: "ace.png".into(),
            back: Some("back.png".into()),
        };
        assert_eq!(detail.visible_face(false), "ace.png");
        assert_eq!(detail.visible_face(true), "back.png");
        let single = DetailBehavior {
            front: "token.png".into(),
            back: None,
        };
        assert_eq!(single.visible_face(true), "token.png");
    }
}
