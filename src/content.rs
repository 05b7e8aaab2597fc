//! Static feature cards served by `GET /features`.

use serde::Serialize;

/// Icon shown on a feature card. Serialised as the icon's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureIcon {
    Dna,
    Bot,
    Microscope,
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
    pub image: &'static str,
    pub icon: FeatureIcon,
    pub stats: [&'static str; 3],
}

/// The product feature cards, in display order.
pub fn default_features() -> Vec<Feature> {
    vec![
        Feature {
            title: "Document Analysis & Automation Suggestion",
            description: "Our intelligent system analyzes documents, identifies key information, \
                and suggests automation opportunities based on standard operating procedures \
                (SOPs). This reduces manual work and improves operational efficiency.",
            image: "/images/image1.jpg",
            icon: FeatureIcon::Dna,
            stats: ["99.9% Accuracy", "1000x Faster", "50+ Markers"],
        },
        Feature {
            title: "Robotic Laboratories",
            description: "Fully automated laboratory processes using robotic manipulators. \
                Eliminates human error and ensures sterility at every research stage.",
            image: "/images/image2.jpg",
            icon: FeatureIcon::Bot,
            stats: ["24/7 Operation", "0% Errors", "100% Sterility"],
        },
        Feature {
            title: "Next-Gen Microscopy",
            description: "Ultra-precise visualization of cellular structures with nanometer \
                resolution. Observe genetic processes in real-time.",
            image: "/images/image 3.jpg",
            icon: FeatureIcon::Microscope,
            stats: ["1nm Resolution", "Real-time", "3D Visualization"],
        },
        Feature {
            title: "Quantum Computing",
            description: "We use quantum processors to simulate complex molecular \
                interactions. Predict gene behavior with unmatched precision.",
            image: "/images/image4.jpg",
            icon: FeatureIcon::Cpu,
            stats: ["Quantum Speed", "Molecular Modeling", "Predictive Analytics"],
        },
    ]
}
