//! # Naskah ingest
//!
//! Admin tool registering a new manuscript:
//!
//! 1. log in to the backend with the admin credentials
//! 2. upload the PDF to the hosting service, which converts it to one
//!    image per page and reports the page count
//! 3. create the naskah record through the backend, which derives the
//!    per-page image URLs from the upload's public id
//!
//! The record only ever references the hosting service by URL; no image
//! data passes through the backend.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pusaka_catalog::{CreateManuscript, Manuscript, MediaUpload};
use reqwest::{multipart, Client};
use serde_json::json;

pub mod models;
pub mod utils;

use models::{LoginResponse, UPLOAD_PRESET};
use utils::sanitize_category;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct IngestArgs {
    /// PDF file to upload
    pub file: PathBuf,

    /// Naskah title
    #[arg(long)]
    pub judul: String,

    #[arg(long, default_value = "")]
    pub deskripsi: String,

    #[arg(long)]
    pub kategori: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long, default_value = "http://127.0.0.1:1111")]
    pub server_url: String,

    /// Hosting service API root (cloud-specific)
    #[arg(long, default_value = "https://api.cloudinary.com/v1_1/dn1oejv6r")]
    pub media_url: String,

    #[arg(long, default_value = "admin@example.com")]
    pub email: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn ingest(args: IngestArgs) -> Result<()> {
    let pb = ProgressBar::new(3);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap()
        .progress_chars("=> "),
    );

    let client = Client::new();

    pb.set_message("Logging in");
    let token = login(&client, &args).await?;
    pb.inc(1);

    pb.set_message(format!("Uploading {}", args.file.display()));
    let upload = upload_pdf(&client, &args).await?;
    pb.inc(1);

    pb.set_message("Registering naskah");
    let naskah = create_naskah(&client, &args, &token, &upload).await?;
    pb.inc(1);

    pb.finish_with_message("Done");

    println!("\nCreated naskah: {}", naskah.title);
    println!("Id: {}", naskah.id);
    println!("Halaman: {}", naskah.total_pages);

    Ok(())
}

async fn login(client: &Client, args: &IngestArgs) -> Result<String> {
    let response = client
        .post(format!("{}/login", args.server_url))
        .json(&json!({ "email": args.email, "password": args.password }))
        .send()
        .await
        .context("reaching the backend")?;

    if !response.status().is_success() {
        bail!("login rejected: {}", response.status());
    }

    Ok(response.json::<LoginResponse>().await?.token)
}

async fn upload_pdf(client: &Client, args: &IngestArgs) -> Result<MediaUpload> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;

    let file_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("naskah.pdf")
        .to_string();

    let form = multipart::Form::new()
        .part(
            "file",
            multipart::Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("application/pdf")?,
        )
        .text("upload_preset", UPLOAD_PRESET);

    let response = client
        .post(format!("{}/auto/upload", args.media_url))
        .multipart(form)
        .send()
        .await
        .context("reaching the hosting service")?;

    if !response.status().is_success() {
        bail!("upload failed: {}", response.status());
    }

    Ok(response.json::<MediaUpload>().await?)
}

async fn create_naskah(
    client: &Client,
    args: &IngestArgs,
    token: &str,
    upload: &MediaUpload,
) -> Result<Manuscript> {
    let payload = CreateManuscript {
        title: args.judul.trim().to_string(),
        description: args.deskripsi.clone(),
        category: args
            .kategori
            .as_deref()
            .map(sanitize_category)
            .filter(|kategori| !kategori.is_empty()),
        author: args.author.clone(),
        total_pages: upload.total_pages(),
        pdf_url: Some(upload.secure_url.clone()),
        pages: Vec::new(),
        thumbnail: None,
        public_id: Some(upload.public_id.clone()),
    };

    let response = client
        .post(format!("{}/naskah", args.server_url))
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await
        .context("reaching the backend")?;

    if !response.status().is_success() {
        bail!("naskah creation failed: {}", response.status());
    }

    Ok(response.json::<Manuscript>().await?)
}
