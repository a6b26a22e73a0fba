pub mod picture_loss_indication;
