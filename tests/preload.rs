use camola_fx::render::blit;
use camola_fx::{
    Background, BackgroundPreloader, BackgroundSpec, CompositeOptions, DefaultImageLoader,
    FrameCompositor, Mask, PreloadError, Surface,
};
use image::{Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn sample_png() -> Vec<u8> {
    let image = RgbaImage::from_fn(20, 10, |x, y| Rgba([(x * 12) as u8, (y * 25) as u8, 90, 255]));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
    bytes
}

fn write_png(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, sample_png()).unwrap();
    path.display().to_string()
}

/// Serves `/ok.png` and answers 404 to everything else
async fn serve_images() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let png = sample_png();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let png = png.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let response = if head.starts_with("GET /ok.png ") {
                    let mut response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n",
                        png.len()
                    )
                    .into_bytes();
                    response.extend_from_slice(&png);
                    response
                } else {
                    b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_vec()
                };
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

fn local_preloader() -> BackgroundPreloader<DefaultImageLoader> {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    BackgroundPreloader::with_loader(DefaultImageLoader::with_client(client))
}

#[tokio::test]
async fn one_bad_image_does_not_affect_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_png(dir.path(), "good.png");
    let missing = dir.path().join("missing.png").display().to_string();

    let specs = vec![
        BackgroundSpec::None,
        BackgroundSpec::image(good.clone()),
        BackgroundSpec::image(missing),
        BackgroundSpec::blur(5.0),
        BackgroundSpec::image(format!("file://{good}")),
    ];
    let results = local_preloader().preload_backgrounds(&specs).await;

    assert_eq!(results.len(), specs.len());
    for (i, (result, spec)) in results.iter().zip(&specs).enumerate() {
        assert_eq!(&result.spec, spec);
        if i == 2 {
            assert!(!result.ready);
            assert!(result.drawable.is_none());
            assert!(matches!(result.error, Some(PreloadError::Io { .. })));
        } else {
            assert!(result.ready, "entry {i} should be ready");
            assert!(result.error.is_none());
        }
    }
    assert!(results[0].drawable.is_none());
    assert!(results[3].drawable.is_none());
    assert_eq!(results[1].drawable.as_ref().map(|d| d.dimensions()), Some((20, 10)));
    assert_eq!(results[4].drawable, results[1].drawable);
}

#[tokio::test]
async fn undecodable_file_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.png");
    std::fs::write(&path, b"definitely not a png").unwrap();

    let result = local_preloader()
        .preload(&BackgroundSpec::image(path.display().to_string()))
        .await;
    assert!(!result.ready);
    assert!(matches!(result.error, Some(PreloadError::Decode { .. })));
}

#[tokio::test]
async fn http_backgrounds_load_and_report_status() {
    let base = serve_images().await;
    let specs = [
        BackgroundSpec::image(format!("{base}/ok.png")),
        BackgroundSpec::image(format!("{base}/gone.png")),
        BackgroundSpec::image("http://"),
    ];
    let results = local_preloader().preload_backgrounds(&specs).await;

    assert!(results[0].ready);
    assert_eq!(results[0].drawable.as_ref().map(|d| d.dimensions()), Some((20, 10)));
    assert!(matches!(results[1].error, Some(PreloadError::Http { status: 404, .. })));
    assert!(matches!(results[2].error, Some(PreloadError::Network { .. })));
}

#[tokio::test]
async fn preloaded_image_fills_the_background() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_png(dir.path(), "beach.png");
    let preloaded = local_preloader().preload(&BackgroundSpec::image(src)).await;
    let background = preloaded.background();
    let Background::Image(Some(image)) = &background else {
        panic!("image did not load: {:?}", preloaded.error);
    };

    let mut expected = Surface::new(100, 100).unwrap();
    blit(&mut expected, image, false);

    let frame = Surface::filled(100, 100, camola_fx::Color::rgb(255, 0, 0)).unwrap();
    let mut output = Surface::empty();
    let options = CompositeOptions::new(background.clone());
    FrameCompositor::new()
        .composite_frame(&frame, &Mask::uniform(100, 100, 0), &mut output, &options)
        .unwrap();
    assert_eq!(output, expected);
}
