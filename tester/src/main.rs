use std::fs;

use pusaka_catalog::{page_image_urls, CreateManuscript};

fn main() {
    let halaman = page_image_urls(
        "https://res.cloudinary.com/dn1oejv6r/image/upload",
        "naskah/contoh",
        3,
    );

    let payload = CreateManuscript {
        title: "Serat Contoh".to_string(),
        description: "Naskah percobaan untuk uji endpoint".to_string(),
        category: Some("sejarah".to_string()),
        author: None,
        total_pages: 3,
        pdf_url: Some(
            "https://res.cloudinary.com/dn1oejv6r/raw/upload/naskah/contoh.pdf".to_string(),
        ),
        pages: halaman,
        thumbnail: None,
        public_id: None,
    };

    let json = serde_json::to_string_pretty(&payload).unwrap();
    println!("{json}");

    fs::write("../test.json", json).unwrap();
}
