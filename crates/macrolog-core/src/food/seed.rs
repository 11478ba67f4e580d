//! Seed catalog of common foods (USDA FoodData Central values)

use crate::models::{FoodOrigin, FoodRecord, MacroNutrients};
use crate::units::Unit;

/// calories, protein, carbs, fat, fiber, sugar, sodium
type Core = (f64, f64, f64, f64, f64, f64, f64);

struct Seed {
    name: &'static str,
    display: &'static str,
    aliases: &'static [&'static str],
    category: &'static str,
    unit: &'static str,
    core: Core,
    cholesterol_mg: Option<f64>,
    saturated_fat_g: Option<f64>,
    preparation: &'static str,
    default_portion: f64,
    fdc_id: &'static str,
}

impl Seed {
    fn to_record(&self) -> FoodRecord {
        let (calories, protein_g, carbs_g, fat_g, fiber_g, sugar_g, sodium_mg) = self.core;
        let macros = MacroNutrients {
            calories,
            protein_g,
            carbs_g,
            fat_g,
            fiber_g,
            sugar_g,
            sodium_mg,
            cholesterol_mg: self.cholesterol_mg,
            saturated_fat_g: self.saturated_fat_g,
            trans_fat_g: None,
        };
        let mut record = FoodRecord::new(self.name, self.display, Unit::parse(self.unit), macros)
            .with_aliases(self.aliases)
            .with_category(self.category);
        record.preparation_style = Some(self.preparation.to_string());
        record.default_portion = Some(self.default_portion);
        record.source = "usda_fdc".to_string();
        record.source_id = Some(self.fdc_id.to_string());
        record.origin = FoodOrigin::Seed;
        record
    }
}

const SEEDS: &[Seed] = &[
    Seed {
        name: "egg_large_boiled",
        display: "Egg, Large, Boiled",
        aliases: &["egg", "eggs", "boiled egg", "hard boiled egg", "boiled eggs"],
        category: "protein",
        unit: "piece",
        core: (70.0, 6.0, 0.6, 5.0, 0.0, 0.6, 62.0),
        cholesterol_mg: Some(186.0),
        saturated_fat_g: Some(1.6),
        preparation: "boiled",
        default_portion: 2.0,
        fdc_id: "FDC_1123",
    },
    Seed {
        name: "egg_large_fried",
        display: "Egg, Large, Fried",
        aliases: &["fried egg", "fried eggs", "egg fried"],
        category: "protein",
        unit: "piece",
        core: (90.0, 6.3, 0.4, 7.0, 0.0, 0.4, 94.0),
        cholesterol_mg: Some(210.0),
        saturated_fat_g: Some(2.0),
        preparation: "fried",
        default_portion: 2.0,
        fdc_id: "FDC_1124",
    },
    Seed {
        name: "egg_large_scrambled",
        display: "Egg, Large, Scrambled",
        aliases: &["scrambled egg", "scrambled eggs", "egg scrambled"],
        category: "protein",
        unit: "piece",
        core: (102.0, 6.7, 1.6, 7.5, 0.0, 1.3, 152.0),
        cholesterol_mg: Some(214.0),
        saturated_fat_g: Some(2.2),
        preparation: "scrambled",
        default_portion: 2.0,
        fdc_id: "FDC_1125",
    },
    Seed {
        name: "chicken_breast_grilled",
        display: "Chicken Breast, Grilled",
        aliases: &["chicken", "chicken breast", "grilled chicken", "chicken grilled"],
        category: "protein",
        unit: "100g",
        core: (165.0, 31.0, 0.0, 3.6, 0.0, 0.0, 74.0),
        cholesterol_mg: Some(85.0),
        saturated_fat_g: Some(1.0),
        preparation: "grilled",
        default_portion: 150.0,
        fdc_id: "FDC_171477",
    },
    Seed {
        name: "chicken_breast_fried",
        display: "Chicken Breast, Fried",
        aliases: &["fried chicken", "chicken fried"],
        category: "protein",
        unit: "100g",
        core: (246.0, 29.0, 8.6, 10.2, 0.3, 0.2, 451.0),
        cholesterol_mg: Some(95.0),
        saturated_fat_g: Some(2.7),
        preparation: "fried",
        default_portion: 150.0,
        fdc_id: "FDC_171478",
    },
    Seed {
        name: "salmon_grilled",
        display: "Salmon, Grilled",
        aliases: &["salmon", "grilled salmon", "salmon fillet"],
        category: "protein",
        unit: "100g",
        core: (206.0, 22.1, 0.0, 12.4, 0.0, 0.0, 59.0),
        cholesterol_mg: Some(63.0),
        saturated_fat_g: Some(2.5),
        preparation: "grilled",
        default_portion: 150.0,
        fdc_id: "FDC_175168",
    },
    Seed {
        name: "tuna_canned",
        display: "Tuna, Canned in Water",
        aliases: &["tuna", "canned tuna", "tuna can"],
        category: "protein",
        unit: "100g",
        core: (116.0, 25.5, 0.0, 0.8, 0.0, 0.0, 247.0),
        cholesterol_mg: Some(42.0),
        saturated_fat_g: Some(0.2),
        preparation: "canned",
        default_portion: 100.0,
        fdc_id: "FDC_175149",
    },
    Seed {
        name: "rice_white_cooked",
        display: "Rice, White, Cooked",
        aliases: &["rice", "white rice", "cooked rice", "steamed rice"],
        category: "carbs",
        unit: "cup",
        core: (206.0, 4.3, 44.5, 0.4, 0.6, 0.1, 2.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "cooked",
        default_portion: 1.0,
        fdc_id: "FDC_168878",
    },
    Seed {
        name: "rice_brown_cooked",
        display: "Rice, Brown, Cooked",
        aliases: &["brown rice", "whole grain rice"],
        category: "carbs",
        unit: "cup",
        core: (218.0, 4.5, 45.8, 1.6, 3.5, 0.7, 2.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "cooked",
        default_portion: 1.0,
        fdc_id: "FDC_168880",
    },
    Seed {
        name: "bread_whole_wheat",
        display: "Bread, Whole Wheat",
        aliases: &["bread", "whole wheat bread", "wheat bread", "brown bread"],
        category: "carbs",
        unit: "slice",
        core: (69.0, 3.6, 11.6, 1.2, 1.9, 1.4, 132.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "baked",
        default_portion: 2.0,
        fdc_id: "FDC_172687",
    },
    Seed {
        name: "bread_white",
        display: "Bread, White",
        aliases: &["white bread"],
        category: "carbs",
        unit: "slice",
        core: (75.0, 2.3, 14.2, 1.0, 0.8, 1.6, 147.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "baked",
        default_portion: 2.0,
        fdc_id: "FDC_172686",
    },
    Seed {
        name: "pasta_cooked",
        display: "Pasta, Cooked",
        aliases: &["pasta", "spaghetti", "noodles", "cooked pasta"],
        category: "carbs",
        unit: "cup",
        core: (221.0, 8.1, 43.2, 1.3, 2.5, 0.8, 1.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "cooked",
        default_portion: 1.0,
        fdc_id: "FDC_168927",
    },
    Seed {
        name: "oats_cooked",
        display: "Oats, Cooked (Oatmeal)",
        aliases: &["oats", "oatmeal", "porridge", "cooked oats"],
        category: "carbs",
        unit: "cup",
        core: (166.0, 5.9, 28.1, 3.6, 4.0, 0.6, 9.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "cooked",
        default_portion: 1.0,
        fdc_id: "FDC_168898",
    },
    Seed {
        name: "potato_baked",
        display: "Potato, Baked",
        aliases: &["potato", "baked potato", "potatoes"],
        category: "carbs",
        unit: "medium",
        core: (161.0, 4.3, 36.6, 0.2, 3.8, 1.9, 17.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "baked",
        default_portion: 1.0,
        fdc_id: "FDC_170093",
    },
    Seed {
        name: "broccoli_cooked",
        display: "Broccoli, Cooked",
        aliases: &["broccoli", "cooked broccoli"],
        category: "vegetables",
        unit: "cup",
        core: (55.0, 3.7, 11.2, 0.6, 5.1, 2.2, 64.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "cooked",
        default_portion: 1.0,
        fdc_id: "FDC_169967",
    },
    Seed {
        name: "spinach_raw",
        display: "Spinach, Raw",
        aliases: &["spinach", "raw spinach", "fresh spinach"],
        category: "vegetables",
        unit: "cup",
        core: (7.0, 0.9, 1.1, 0.1, 0.7, 0.1, 24.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "raw",
        default_portion: 1.0,
        fdc_id: "FDC_168462",
    },
    Seed {
        name: "apple_raw",
        display: "Apple, Raw",
        aliases: &["apple", "apples", "raw apple", "fresh apple"],
        category: "fruits",
        unit: "medium",
        core: (95.0, 0.5, 25.1, 0.3, 4.4, 18.9, 2.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "raw",
        default_portion: 1.0,
        fdc_id: "FDC_171688",
    },
    Seed {
        name: "banana_raw",
        display: "Banana, Raw",
        aliases: &["banana", "bananas", "raw banana", "fresh banana"],
        category: "fruits",
        unit: "medium",
        core: (105.0, 1.3, 27.0, 0.4, 3.1, 14.4, 1.0),
        cholesterol_mg: None,
        saturated_fat_g: None,
        preparation: "raw",
        default_portion: 1.0,
        fdc_id: "FDC_173944",
    },
    Seed {
        name: "milk_whole",
        display: "Milk, Whole",
        aliases: &["milk", "whole milk", "full fat milk"],
        category: "dairy",
        unit: "cup",
        core: (149.0, 7.7, 11.7, 7.9, 0.0, 12.3, 105.0),
        cholesterol_mg: Some(24.0),
        saturated_fat_g: Some(4.6),
        preparation: "raw",
        default_portion: 1.0,
        fdc_id: "FDC_746782",
    },
    Seed {
        name: "yogurt_plain",
        display: "Yogurt, Plain",
        aliases: &["yogurt", "yoghurt", "plain yogurt"],
        category: "dairy",
        unit: "cup",
        core: (154.0, 12.9, 17.2, 3.8, 0.0, 17.2, 172.0),
        cholesterol_mg: Some(15.0),
        saturated_fat_g: Some(2.5),
        preparation: "raw",
        default_portion: 1.0,
        fdc_id: "FDC_170903",
    },
    Seed {
        name: "avocado_raw",
        display: "Avocado, Raw",
        aliases: &["avocado", "avocados", "raw avocado"],
        category: "fats",
        unit: "medium",
        core: (234.0, 2.9, 12.8, 21.4, 10.1, 0.9, 10.0),
        cholesterol_mg: None,
        saturated_fat_g: Some(3.1),
        preparation: "raw",
        default_portion: 1.0,
        fdc_id: "FDC_171705",
    },
    Seed {
        name: "almonds_raw",
        display: "Almonds, Raw",
        aliases: &["almonds", "almond", "raw almonds"],
        category: "fats",
        unit: "oz",
        core: (164.0, 6.0, 6.1, 14.2, 3.5, 1.2, 0.0),
        cholesterol_mg: None,
        saturated_fat_g: Some(1.1),
        preparation: "raw",
        default_portion: 1.0,
        fdc_id: "FDC_170567",
    },
];

/// The built-in catalog, in registration order
pub fn seed_foods() -> Vec<FoodRecord> {
    SEEDS.iter().map(Seed::to_record).collect()
}
